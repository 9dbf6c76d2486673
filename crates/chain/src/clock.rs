//! Concrete `Clock` backed by `tokio::time`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use clob_core::capability::Clock;
use tokio_util::sync::CancellationToken;

/// Wall-clock time plus cancellable sleeps, racing `tokio::time::sleep`
/// against a `CancellationToken` the same way the tracker races its poll
/// interval.
pub struct TokioClock;

impl TokioClock {
    pub fn new() -> Self {
        TokioClock
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or(0)
    }

    async fn delay(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = cancel.cancelled() => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delay_elapses_when_not_canceled() {
        let clock = TokioClock::new();
        let cancel = CancellationToken::new();
        let elapsed = clock.delay(Duration::from_millis(5), &cancel).await;
        assert!(elapsed);
    }

    #[tokio::test]
    async fn delay_returns_false_when_canceled_first() {
        let clock = TokioClock::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let elapsed = clock.delay(Duration::from_secs(5), &cancel).await;
        assert!(!elapsed);
    }

    #[test]
    fn now_ms_is_nonzero() {
        let clock = TokioClock::new();
        assert!(clock.now_ms() > 0);
    }
}
