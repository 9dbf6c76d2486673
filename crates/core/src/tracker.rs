use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::B256;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::capability::{Clock, RpcCap};
use crate::events::{CoreEvent, EventError, Receipt};

const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// State the tracker keeps per watched hash.
struct TrackedTx {
    attempts: u32,
    cancel: CancellationToken,
}

/// Background poller: one spawned task per watched tx-hash, looping on
/// `Clock::delay` between polls inside a `select!`-free loop that treats a
/// canceled delay as the per-hash cancellation signal (mirrors the pack's
/// `FillerTask::run_loop`, generalized off `tokio::time::interval` so the
/// whole loop runs under a `FakeClock` in tests). Many hashes are polled
/// concurrently and independently; there is no ordering between receipt
/// events for different hashes.
pub struct TxTracker<R: RpcCap> {
    rpc: Arc<R>,
    clock: Arc<dyn Clock>,
    watch_set: Arc<DashMap<B256, TrackedTx>>,
    events: mpsc::Sender<CoreEvent>,
    poll_interval: Duration,
    max_attempts: u32,
}

impl<R: RpcCap + 'static> TxTracker<R> {
    pub fn new(rpc: Arc<R>, clock: Arc<dyn Clock>, poll_interval: Duration, events: mpsc::Sender<CoreEvent>) -> Self {
        TxTracker {
            rpc,
            clock,
            watch_set: Arc::new(DashMap::new()),
            events,
            poll_interval,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Starts watching `tx_hash`, associating it with `request_id` for the
    /// emitted events. Spawns its own polling task; returns immediately.
    #[instrument(skip(self), fields(tx_hash = %tx_hash))]
    pub fn track(&self, tx_hash: B256, request_id: Option<String>) {
        let cancel = CancellationToken::new();
        self.watch_set.insert(tx_hash, TrackedTx { attempts: 0, cancel: cancel.clone() });

        let rpc = self.rpc.clone();
        let clock = self.clock.clone();
        let watch_set = self.watch_set.clone();
        let events = self.events.clone();
        let poll_interval = self.poll_interval;
        let max_attempts = self.max_attempts;

        tokio::spawn(async move {
            loop {
                if cancel.is_cancelled() {
                    debug!(tx_hash = %tx_hash, "tracker canceled");
                    break;
                }

                match rpc.get_receipt(tx_hash).await {
                    Ok(Some(receipt)) => {
                        let receipt = Receipt {
                            tx_hash,
                            status: receipt.status,
                            block_number: receipt.block_number,
                            gas_used: receipt.gas_used,
                        };
                        let event = if receipt.succeeded() {
                            CoreEvent::TxSuccessful { request_id: request_id.clone(), receipt }
                        } else {
                            CoreEvent::TxFailed { request_id: request_id.clone(), receipt }
                        };
                        let _ = events.send(event).await;
                        watch_set.remove(&tx_hash);
                        break;
                    }
                    Ok(None) => {
                        // Not yet mined — keep polling, this is not a failure.
                    }
                    Err(err) => {
                        let attempts = {
                            let mut entry = watch_set.get_mut(&tx_hash).expect("tracked entry");
                            entry.attempts += 1;
                            entry.attempts
                        };
                        warn!(tx_hash = %tx_hash, attempts, error = %err, "receipt poll failed");
                        if attempts >= max_attempts {
                            let rid = request_id.clone().unwrap_or_else(|| tx_hash.to_string());
                            let _ = events
                                .send(CoreEvent::Error {
                                    request_id: rid,
                                    error: EventError { code: 5, message: err.to_string() },
                                })
                                .await;
                            watch_set.remove(&tx_hash);
                            break;
                        }
                    }
                }

                if !clock.delay(poll_interval, &cancel).await {
                    debug!(tx_hash = %tx_hash, "tracker canceled");
                    watch_set.remove(&tx_hash);
                    break;
                }
            }
        });
    }

    pub fn is_watching(&self, tx_hash: B256) -> bool {
        self.watch_set.contains_key(&tx_hash)
    }

    /// Stops watching `tx_hash` without emitting any event.
    pub fn abandon(&self, tx_hash: B256) {
        if let Some((_, tracked)) = self.watch_set.remove(&tx_hash) {
            tracked.cancel.cancel();
        }
    }
}
