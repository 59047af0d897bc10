//! # Emit a single signal toward a channel.
//!
//! Executes one emission of a [`Channel`] with optional deadline and cancellation,
//! publishes lifecycle events to [`Bus`].
//!
//! ## Event flow
//!
//! ```text
//! Success:
//!   channel.emit_signal() → Ok(()) → publish SignalEmitted
//!
//! Cancellation:
//!   token cancelled while emitting → Err(Canceled) (no event; the loop reports the stop)
//!
//! Failure:
//!   channel.emit_signal() → Err(Emit/Fatal) → publish SignalFailed
//!
//! Timeout:
//!   deadline exceeded → publish SignalTimeout
//!                     → return Timeout error
//!                     → publish SignalFailed (timeout)
//! ```
//!
//! ## Rules
//! - Publishes **at most one** terminal event: `SignalEmitted` or `SignalFailed`
//! - `SignalTimeout` is published **in addition to** `SignalFailed` on timeout
//! - Cancellation drops the in-flight emission future

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::{
    channels::Channel,
    error::SignalError,
    events::{Bus, Event, EventKind},
};

/// Emits one signal through `channel`, publishing lifecycle events to `bus`.
pub async fn emit_once<C: Channel + ?Sized>(
    channel: &C,
    token: &CancellationToken,
    deadline: Option<Duration>,
    emission: u32,
    bus: &Bus,
) -> Result<(), SignalError> {
    let emit = async {
        match deadline {
            Some(dur) => match time::timeout(dur, channel.emit_signal()).await {
                Ok(r) => r,
                Err(_elapsed) => {
                    publish_timeout(bus, channel.id(), dur, emission);
                    Err(SignalError::Timeout { timeout: dur })
                }
            },
            None => channel.emit_signal().await,
        }
    };

    let res = tokio::select! {
        r = emit => r,
        _ = token.cancelled() => Err(SignalError::Canceled),
    };

    match res {
        Ok(()) => {
            bus.publish(
                Event::new(EventKind::SignalEmitted)
                    .with_key(channel.id())
                    .with_emission(emission),
            );
            Ok(())
        }
        Err(SignalError::Canceled) => Err(SignalError::Canceled),
        Err(e) => {
            bus.publish(
                Event::new(EventKind::SignalFailed)
                    .with_key(channel.id())
                    .with_emission(emission)
                    .with_reason(e.to_string()),
            );
            Err(e)
        }
    }
}

/// Publishes `SignalTimeout` event (always followed by `SignalFailed`).
fn publish_timeout(bus: &Bus, key: &str, dur: Duration, emission: u32) {
    bus.publish(
        Event::new(EventKind::SignalTimeout)
            .with_key(key)
            .with_timeout(dur)
            .with_emission(emission),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::EmitFn;

    #[tokio::test]
    async fn test_success_publishes_emitted() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let ch = EmitFn::new("c", || async { Ok(()) });

        emit_once(&ch, &CancellationToken::new(), None, 1, &bus)
            .await
            .unwrap();

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SignalEmitted);
        assert_eq!(ev.emission, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_publishes_timeout_then_failed() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let ch = EmitFn::new("slow", || async {
            time::sleep(Duration::from_secs(60)).await;
            Ok(())
        });

        let err = emit_once(
            &ch,
            &CancellationToken::new(),
            Some(Duration::from_secs(1)),
            2,
            &bus,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, SignalError::Timeout { .. }));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::SignalTimeout);
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::SignalFailed);
    }

    #[tokio::test]
    async fn test_cancelled_emission_is_silent() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        let token = CancellationToken::new();
        token.cancel();
        let ch = EmitFn::new("c", || futures::future::pending::<Result<(), SignalError>>());

        let err = emit_once(&ch, &token, None, 1, &bus).await.unwrap_err();
        assert!(matches!(err, SignalError::Canceled));
        assert!(rx.try_recv().is_err());
    }
}
