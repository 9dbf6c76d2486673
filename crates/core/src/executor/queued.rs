use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::capability::{Clock, RpcCap, SignerCap};
use crate::error::CoreError;
use crate::events::{CoreEvent, EventError};
use crate::executor::pipeline::run_pipeline_arc;
use crate::nonce::NonceManager;
use crate::registry::PendingRequestRegistry;
use crate::sequencer::{CallSequencer, CallSequencerRegistry, SequencerKey, SlotState, SubmitOutcome};
use crate::tracker::TxTracker;
use crate::tx::TxRequestParams;

/// Places each request into a per-signer `CallSequencer` and returns once
/// the request has reached mempool (or failed/canceled before that).
/// Strict in-order submission and strict per-signer back-pressure; supports
/// `try_cancel(request_id)` for slots still `Queued`.
///
/// Bound to exactly one `SignerCap`, so every request this executor submits
/// shares the same `CallSequencer` instance (keyed by `(signer, rpc)`
/// identity) — the tracker-to-sequencer completion loop below relies on
/// that to call `complete()` on the right worker.
pub struct QueuedExecutor<S: SignerCap + 'static, R: RpcCap + 'static> {
    signer: Arc<S>,
    registry: Arc<PendingRequestRegistry>,
    sequencer: Arc<CallSequencer<alloy::primitives::B256>>,
    tracker: Arc<TxTracker<R>>,
    events: mpsc::Sender<CoreEvent>,
}

impl<S: SignerCap + 'static, R: RpcCap + 'static> QueuedExecutor<S, R> {
    /// Builds the executor and spawns the background task that drains
    /// tracker events for this signer, forwards them to `events`, and calls
    /// `CallSequencer::complete` once a request reaches a terminal state —
    /// this is what releases the worker to pull the next slot (P4).
    pub fn new(
        signer: Arc<S>,
        rpc: Arc<R>,
        nonce_manager: Arc<NonceManager<R>>,
        clock: Arc<dyn Clock>,
        poll_interval: std::time::Duration,
        sequencer_registry: Arc<CallSequencerRegistry<alloy::primitives::B256>>,
        events: mpsc::Sender<CoreEvent>,
    ) -> Self {
        let registry = Arc::new(PendingRequestRegistry::new());

        let key = SequencerKey::new(signer.address(), &rpc);
        let seq_signer = signer.clone();
        let seq_rpc = rpc.clone();
        let seq_nonce_manager = nonce_manager.clone();
        let queue_capacity = crate::config().sequencer.queue_capacity;
        let sequencer = sequencer_registry.get_or_spawn_with_capacity(
            key,
            queue_capacity,
            move |params, _state: Arc<Mutex<SlotState>>| {
                let signer = seq_signer.clone();
                let rpc = seq_rpc.clone();
                let nonce_manager = seq_nonce_manager.clone();
                async move {
                    run_pipeline_arc(signer, rpc, nonce_manager, params, CancellationToken::new())
                        .await
                        .map(|submitted| submitted.tx_hash)
                }
            },
        );

        let (tracker_tx, mut tracker_rx) = mpsc::channel(64);
        let max_attempts = crate::config().tracker.max_attempts;
        let tracker = Arc::new(TxTracker::new(rpc.clone(), clock, poll_interval, tracker_tx).with_max_attempts(max_attempts));

        let dispatch_sequencer = sequencer.clone();
        let dispatch_registry = registry.clone();
        let dispatch_events = events.clone();
        tokio::spawn(async move {
            while let Some(event) = tracker_rx.recv().await {
                if let Some(request_id) = event.request_id() {
                    dispatch_registry.remove(request_id);
                    dispatch_sequencer.complete(request_id);
                }
                let _ = dispatch_events.send(event).await;
            }
        });

        QueuedExecutor { signer, registry, sequencer, tracker, events }
    }

    #[instrument(skip(self, params, cancel), fields(request_id = %params.request_id))]
    pub async fn submit(&self, params: TxRequestParams, cancel: &CancellationToken) -> Result<alloy::primitives::B256, CoreError> {
        let request_id = params.request_id.clone();
        self.registry.register(request_id.clone());

        let outcome = self.sequencer.enqueue(params, cancel).await;

        match outcome {
            SubmitOutcome::Submitted(tx_hash) => {
                self.registry.mark_mempooled(&request_id, tx_hash);
                let _ = self
                    .events
                    .send(CoreEvent::Mempooled { request_id: request_id.clone(), tx_hash })
                    .await;
                self.tracker.track(tx_hash, Some(request_id));
                Ok(tx_hash)
            }
            SubmitOutcome::Canceled => {
                self.registry.remove(&request_id);
                Err(CoreError::Canceled)
            }
            SubmitOutcome::Failed(err) => {
                self.registry.remove(&request_id);
                let _ = self
                    .events
                    .send(CoreEvent::Error { request_id, error: EventError::from(&err) })
                    .await;
                Err(err)
            }
        }
    }

    pub async fn try_cancel(&self, request_id: &str) -> bool {
        self.sequencer.try_cancel(request_id).await
    }

    pub fn signer_address(&self) -> alloy::primitives::Address {
        self.signer.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::fakes::{FakeClock, FakeRpc, FakeSigner};
    use crate::events::Receipt;
    use crate::tx::{GasFields, TxRequest};
    use alloy::primitives::{Address, Bytes, U256};
    use std::time::Duration;

    fn make_params(id: &str, from: Address) -> TxRequestParams {
        TxRequestParams::new(
            id,
            TxRequest::new(from, Address::repeat_byte(0xAB), U256::ZERO, Bytes::new(), 1, GasFields::Legacy { gas_price: Some(1) }),
        )
    }

    fn new_executor(
        rpc: Arc<FakeRpc>,
        from: Address,
        events_tx: mpsc::Sender<CoreEvent>,
    ) -> QueuedExecutor<FakeSigner, FakeRpc> {
        let signer = Arc::new(FakeSigner::new(from));
        let nonce_manager = Arc::new(NonceManager::new(rpc.clone()));
        let sequencer_registry = Arc::new(CallSequencerRegistry::new());
        let clock = Arc::new(FakeClock::new());
        QueuedExecutor::new(signer, rpc, nonce_manager, clock, Duration::from_millis(5), sequencer_registry, events_tx)
    }

    /// A second request's slot sits `Queued` behind a still-in-flight first
    /// request (the worker won't pull it until the first is `complete()`d);
    /// `try_cancel` on that queued slot must succeed, and the canceled
    /// request's `submit` must resolve to `CoreError::Canceled` without
    /// ever touching the RPC.
    #[tokio::test]
    async fn cancel_while_queued_prevents_dequeue_and_does_not_block_the_sequencer() {
        let from = Address::repeat_byte(0xC);
        let rpc = Arc::new(FakeRpc::new(1));
        let (events_tx, mut events_rx) = mpsc::channel(64);
        let executor = Arc::new(new_executor(rpc.clone(), from, events_tx));

        let cancel = CancellationToken::new();
        let tx_hash_r1 = executor.submit(make_params("r1", from), &cancel).await.unwrap();
        let mempooled = events_rx.recv().await.unwrap();
        assert!(matches!(mempooled, CoreEvent::Mempooled { .. }));

        // r1 is now `Mempool`, awaiting `complete()`; the worker can't pull
        // r2 off the channel yet, so it stays `Queued`.
        let executor2 = executor.clone();
        let cancel2 = cancel.clone();
        let submit_r2 = tokio::spawn(async move { executor2.submit(make_params("r2", from), &cancel2).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(executor.try_cancel("r2").await, "r2 should still be queued and cancelable");

        let result = submit_r2.await.unwrap();
        assert!(matches!(result, Err(CoreError::Canceled)));

        // Completing r1 drains the worker past the canceled r2 slot without
        // it ever reaching the RPC.
        rpc.set_receipt(tx_hash_r1, Receipt { tx_hash: tx_hash_r1, status: 1, block_number: 1, gas_used: 21_000 });
        let success = tokio::time::timeout(Duration::from_secs(1), events_rx.recv()).await.unwrap().unwrap();
        assert!(matches!(success, CoreEvent::TxSuccessful { .. }));
    }

    /// Per-signer back-pressure: once the bounded per-sequencer channel is
    /// full, a further `enqueue` suspends until either a slot frees up or
    /// the caller's `cancel` token fires.
    #[tokio::test]
    async fn enqueue_suspends_once_the_bounded_queue_is_full() {
        let from = Address::repeat_byte(0xD);
        let rpc = Arc::new(FakeRpc::new(1));
        let (events_tx, mut events_rx) = mpsc::channel(256);
        let executor = Arc::new(new_executor(rpc.clone(), from, events_tx));

        let cancel = CancellationToken::new();
        let tx_hash_r0 = executor.submit(make_params("r0", from), &cancel).await.unwrap();
        let _ = events_rx.recv().await.unwrap();

        // Fill the bounded channel (capacity 16) behind the stuck worker.
        let mut fillers = Vec::new();
        for i in 0..16 {
            let executor = executor.clone();
            let cancel = cancel.clone();
            let id = format!("fill-{i}");
            fillers.push(tokio::spawn(async move { executor.submit(make_params(&id, from), &cancel).await }));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        let overflow_cancel = CancellationToken::new();
        let executor_overflow = executor.clone();
        let overflow_cancel_task = overflow_cancel.clone();
        let overflow = tokio::spawn(async move { executor_overflow.submit(make_params("overflow", from), &overflow_cancel_task).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!overflow.is_finished(), "enqueue should suspend once the bounded channel is full");

        overflow_cancel.cancel();
        let result = overflow.await.unwrap();
        assert!(matches!(result, Err(CoreError::Canceled)));

        // Unstick the worker so the spawned fillers don't leak past the test.
        rpc.set_receipt(tx_hash_r0, Receipt { tx_hash: tx_hash_r0, status: 1, block_number: 1, gas_used: 21_000 });
        cancel.cancel();
        for filler in fillers {
            let _ = filler.await;
        }
    }
}
