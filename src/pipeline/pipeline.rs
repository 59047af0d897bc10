//! # AccessPipeline: ordered guards in front of a protected operation.
//!
//! ## State machine (per invocation)
//! ```text
//! START ─► AUTHENTICATE ─► AUTHORIZE* ─► [custom guards] ─► ADMIT* ─► EXECUTE ─► DONE
//!              │               │                │              │
//!              └───────────────┴────────────────┴──────────────┴─► REJECTED(reason)
//!
//! * only when configured on the builder
//! ```
//!
//! ## Rules
//! - Stages run strictly in order; the first rejection short-circuits
//! - An unauthenticated request never reaches ADMIT (no window mutation)
//! - ADMIT is always the last guard, so a counted request is never rejected later
//! - Admission is not rolled back when EXECUTE fails
//! - A rejected invocation never runs the operation

use std::future::Future;
use std::sync::Arc;

use crate::{
    admission::AdmissionController,
    error::{PipelineError, Rejection},
    pipeline::{
        guard::{Guard, RateLimitGuard, RequireCapabilities},
        identity::{AuthorizationProvider, CapabilitySet, Identity, IdentityProvider},
    },
};

/// Authentication, authorization and admission composed in front of an operation.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use signalvisor::{
///     AccessPipeline, AdmissionController, Identity, IdentityProvider, PipelineError,
///     RateLimit, Rejection, StaticGrants,
/// };
///
/// struct BearerToken;
///
/// #[async_trait]
/// impl IdentityProvider<str> for BearerToken {
///     async fn resolve_identity(&self, token: &str) -> Option<Identity> {
///         token.strip_prefix("Bearer ").map(Identity::new)
///     }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let grants = StaticGrants::new().grant("alice", ["chat"].into_iter().collect());
/// let pipeline = AccessPipeline::<str>::builder(Arc::new(BearerToken))
///     .require(["chat"].into_iter().collect(), Arc::new(grants))
///     .rate_limit(Arc::new(AdmissionController::new(RateLimit::per_seconds(5, 60).unwrap())))
///     .build();
///
/// let out = pipeline
///     .invoke("Bearer alice", |id| async move { Ok::<_, ()>(id.key().len()) })
///     .await;
/// assert_eq!(out.unwrap(), 5);
///
/// let out = pipeline.invoke("nope", |_| async { Ok::<_, ()>(0) }).await;
/// assert!(matches!(out, Err(PipelineError::Rejected(Rejection::Unauthenticated))));
/// # }
/// ```
pub struct AccessPipeline<R: ?Sized + Sync + 'static> {
    identity: Arc<dyn IdentityProvider<R>>,
    guards: Vec<Arc<dyn Guard>>,
}

impl<R: ?Sized + Sync + 'static> AccessPipeline<R> {
    /// Starts a pipeline that authenticates with `identity`.
    pub fn builder(identity: Arc<dyn IdentityProvider<R>>) -> AccessPipelineBuilder<R> {
        AccessPipelineBuilder {
            identity,
            authorize: None,
            custom: Vec::new(),
            admit: None,
        }
    }

    /// Runs every stage for `request`, then `op` with the resolved identity.
    pub async fn invoke<T, E, F, Fut>(&self, request: &R, op: F) -> Result<T, PipelineError<E>>
    where
        F: FnOnce(Identity) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let identity = self.check(request).await?;
        op(identity).await.map_err(PipelineError::Operation)
    }

    /// Runs the guard stages only; returns the identity that may proceed.
    ///
    /// Useful when the protected operation is not a future (e.g. a handler that
    /// responds synchronously after the checks).
    pub async fn check(&self, request: &R) -> Result<Identity, Rejection> {
        let Some(identity) = self.identity.resolve_identity(request).await else {
            tracing::debug!(stage = "authenticate", "invocation rejected: unauthenticated");
            return Err(Rejection::Unauthenticated);
        };

        for guard in &self.guards {
            if let Err(rejection) = guard.check(&identity).await {
                tracing::debug!(
                    caller = identity.key(),
                    guard = guard.name(),
                    stage = %rejection.stage(),
                    reason = rejection.as_label(),
                    "invocation rejected"
                );
                return Err(rejection);
            }
        }
        Ok(identity)
    }

    /// Number of guards after authentication.
    pub fn guard_count(&self) -> usize {
        self.guards.len()
    }
}

/// Builder fixing the stage order: authorize → custom guards → admit.
pub struct AccessPipelineBuilder<R: ?Sized + Sync + 'static> {
    identity: Arc<dyn IdentityProvider<R>>,
    authorize: Option<Arc<dyn Guard>>,
    custom: Vec<Arc<dyn Guard>>,
    admit: Option<Arc<dyn Guard>>,
}

impl<R: ?Sized + Sync + 'static> AccessPipelineBuilder<R> {
    /// Enables AUTHORIZE: the caller must be granted every capability in `required`.
    ///
    /// An empty `required` set disables the stage.
    pub fn require(
        mut self,
        required: CapabilitySet,
        provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        self.authorize = if required.is_empty() {
            None
        } else {
            Some(Arc::new(RequireCapabilities::new(required, provider)) as Arc<dyn Guard>)
        };
        self
    }

    /// Enables ADMIT against `controller`.
    pub fn rate_limit(mut self, controller: Arc<AdmissionController>) -> Self {
        self.admit = Some(Arc::new(RateLimitGuard::new(controller)) as Arc<dyn Guard>);
        self
    }

    /// Appends a custom guard; it runs after AUTHORIZE and before ADMIT.
    pub fn with_guard(mut self, guard: Arc<dyn Guard>) -> Self {
        self.custom.push(guard);
        self
    }

    /// Finalizes the guard chain.
    pub fn build(self) -> AccessPipeline<R> {
        let guards = self
            .authorize
            .into_iter()
            .chain(self.custom)
            .chain(self.admit)
            .collect();
        AccessPipeline {
            identity: self.identity,
            guards,
        }
    }
}
