//! # Guard stages
//!
//! A [`Guard`] inspects an authenticated invocation and either lets it through
//! or returns a [`Rejection`]. The pipeline driver runs guards in order and stops
//! at the first rejection.
//!
//! Built-in guards:
//! - [`RequireCapabilities`]: AUTHORIZE, `required ⊆ granted`
//! - [`RateLimitGuard`]: ADMIT, one request against the caller's window

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    admission::{Admission, AdmissionController},
    error::Rejection,
    pipeline::identity::{AuthorizationProvider, CapabilitySet, Identity},
};

/// Stage of the access pipeline that can reject an invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Identity resolution.
    Authenticate,
    /// Capability check.
    Authorize,
    /// Rate-window admission.
    Admit,
}

impl Stage {
    /// Stable lowercase name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Authenticate => "authenticate",
            Stage::Authorize => "authorize",
            Stage::Admit => "admit",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accept/reject step in front of the protected operation.
#[async_trait]
pub trait Guard: Send + Sync + 'static {
    /// Returns `Err` to stop the invocation.
    async fn check(&self, identity: &Identity) -> Result<(), Rejection>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// AUTHORIZE: the caller must hold every required capability.
pub struct RequireCapabilities {
    required: CapabilitySet,
    provider: Arc<dyn AuthorizationProvider>,
}

impl RequireCapabilities {
    /// Requires every capability in `required`, as granted by `provider`.
    pub fn new(required: CapabilitySet, provider: Arc<dyn AuthorizationProvider>) -> Self {
        Self { required, provider }
    }
}

#[async_trait]
impl Guard for RequireCapabilities {
    async fn check(&self, identity: &Identity) -> Result<(), Rejection> {
        let granted = self.provider.capabilities(identity).await;
        if self.required.is_subset(&granted) {
            Ok(())
        } else {
            Err(Rejection::Forbidden {
                missing: self.required.missing_from(&granted),
            })
        }
    }

    fn name(&self) -> &'static str {
        "require_capabilities"
    }
}

/// ADMIT: counts one request against the caller's rate window.
///
/// The admission is committed as soon as this guard passes.
pub struct RateLimitGuard {
    controller: Arc<AdmissionController>,
}

impl RateLimitGuard {
    /// Admits against the windows of `controller`.
    pub fn new(controller: Arc<AdmissionController>) -> Self {
        Self { controller }
    }
}

#[async_trait]
impl Guard for RateLimitGuard {
    async fn check(&self, identity: &Identity) -> Result<(), Rejection> {
        match self.controller.check(identity.key()) {
            Admission::Accepted => Ok(()),
            Admission::Rejected { retry_after } => Err(Rejection::RateLimited { retry_after }),
        }
    }

    fn name(&self) -> &'static str {
        "rate_limit"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::RateLimit;
    use crate::pipeline::identity::StaticGrants;

    #[tokio::test]
    async fn test_require_capabilities_reports_missing() {
        let grants = StaticGrants::new().grant("bob", ["read"].into_iter().collect());
        let guard = RequireCapabilities::new(
            ["read", "write"].into_iter().collect(),
            Arc::new(grants),
        );

        let err = guard.check(&Identity::new("bob")).await.unwrap_err();
        assert_eq!(
            err,
            Rejection::Forbidden {
                missing: ["write"].into_iter().collect()
            }
        );
        assert_eq!(err.stage(), Stage::Authorize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_guard_maps_rejection() {
        let ctl = Arc::new(AdmissionController::new(
            RateLimit::per_seconds(1, 60).unwrap(),
        ));
        let guard = RateLimitGuard::new(ctl);
        let id = Identity::new("carol");

        assert!(guard.check(&id).await.is_ok());
        let err = guard.check(&id).await.unwrap_err();
        assert_eq!(err.stage(), Stage::Admit);
        assert_eq!(err.as_label(), "rate_limited");
    }
}
