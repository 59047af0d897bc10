//! # Channel abstraction.
//!
//! This module defines the [`Channel`] trait: the narrow capability the supervisor
//! needs from a bot client's channel (an id plus a signal scope and an emission call).
//! The common handle type is [`ChannelRef`], an `Arc<dyn Channel>` suitable for
//! sharing across the runtime.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SignalError;

/// Shared handle to a channel.
pub type ChannelRef = Arc<dyn Channel>;

/// # Signal target.
///
/// A `Channel` has a stable [`id`](Channel::id) that is used as the supervision key.
/// A signal loop brackets its emissions with [`begin_signal`](Channel::begin_signal)
/// and [`end_signal`](Channel::end_signal); `end_signal` is called on every exit path
/// of the loop (exhausted, cancelled, failed) once `begin_signal` succeeded.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use signalvisor::{Channel, SignalError};
///
/// struct Chat { id: String }
///
/// #[async_trait]
/// impl Channel for Chat {
///     fn id(&self) -> &str { &self.id }
///
///     async fn emit_signal(&self) -> Result<(), SignalError> {
///         // POST /channels/{id}/typing ...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Channel: Send + Sync + 'static {
    /// Returns the channel key.
    fn id(&self) -> &str;

    /// Opens the signal scope before the first emission.
    async fn begin_signal(&self) -> Result<(), SignalError> {
        Ok(())
    }

    /// Emits one signal (e.g. "is typing") toward the channel.
    async fn emit_signal(&self) -> Result<(), SignalError>;

    /// Closes the signal scope, retracting the indicator.
    async fn end_signal(&self) {}
}
