//! # Function-backed channel (`EmitFn`)
//!
//! [`EmitFn`] wraps a closure `F: Fn() -> Fut`, producing a fresh emission
//! future per call. Useful for tests and for glue code where the signal is a
//! single API call.
//!
//! ## Example
//! ```rust
//! use signalvisor::{ChannelRef, EmitFn, SignalError};
//!
//! let ch: ChannelRef = EmitFn::arc("general", || async {
//!     // send typing indicator...
//!     Ok::<_, SignalError>(())
//! });
//!
//! assert_eq!(ch.id(), "general");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::channels::Channel;
use crate::error::SignalError;

/// Function-backed channel implementation.
#[derive(Debug)]
pub struct EmitFn<F> {
    id: Cow<'static, str>,
    f: F,
}

impl<F> EmitFn<F> {
    /// Creates a new function-backed channel.
    ///
    /// Prefer [`EmitFn::arc`] when you immediately need a [`ChannelRef`](crate::ChannelRef).
    pub fn new(id: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { id: id.into(), f }
    }

    /// Creates the channel and returns it as a shared handle.
    pub fn arc(id: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(id, f))
    }
}

#[async_trait]
impl<F, Fut> Channel for EmitFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), SignalError>> + Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn emit_signal(&self) -> Result<(), SignalError> {
        (self.f)().await
    }
}
