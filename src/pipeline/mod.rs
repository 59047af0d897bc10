//! # Access pipeline
//!
//! Composes authentication, authorization and admission control as an explicit
//! chain of guards in front of a protected operation.
//!
//! - [`AccessPipeline`] / [`AccessPipelineBuilder`] - the driver and its builder
//! - [`Guard`] - one accept/reject stage ([`RequireCapabilities`], [`RateLimitGuard`])
//! - [`IdentityProvider`], [`AuthorizationProvider`] - external collaborators
//! - [`Identity`], [`CapabilitySet`], [`StaticGrants`] - supporting types

mod guard;
mod identity;
#[allow(clippy::module_inception)]
mod pipeline;

pub use guard::{Guard, RateLimitGuard, RequireCapabilities, Stage};
pub use identity::{AuthorizationProvider, CapabilitySet, Identity, IdentityProvider, StaticGrants};
pub use pipeline::{AccessPipeline, AccessPipelineBuilder};
