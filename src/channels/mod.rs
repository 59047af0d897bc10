//! # Channel abstractions.
//!
//! - [`Channel`] - trait for a signal target (id, scope, emission)
//! - [`ChannelRef`] - shared reference to a channel (`Arc<dyn Channel>`)
//! - [`EmitFn`] - closure-backed channel implementation

mod channel;
mod emit_fn;

pub use channel::{Channel, ChannelRef};
pub use emit_fn::EmitFn;
