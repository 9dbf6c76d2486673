use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::capability::{RpcCap, SignerCap};
use crate::error::CoreError;
use crate::events::{CoreEvent, EventError};
use crate::executor::pipeline::run_pipeline;
use crate::nonce::NonceManager;
use crate::tracker::TxTracker;
use crate::tx::TxRequestParams;

/// Runs the shared pipeline directly on the caller's task. No inter-request
/// ordering beyond the per-address nonce lock; concurrency is bounded only
/// by that lock.
pub struct DirectExecutor<S: SignerCap, R: RpcCap + 'static> {
    signer: Arc<S>,
    rpc: Arc<R>,
    nonce_manager: Arc<NonceManager<R>>,
    tracker: Arc<TxTracker<R>>,
    events: mpsc::Sender<CoreEvent>,
}

impl<S: SignerCap, R: RpcCap + 'static> DirectExecutor<S, R> {
    pub fn new(
        signer: Arc<S>,
        rpc: Arc<R>,
        nonce_manager: Arc<NonceManager<R>>,
        tracker: Arc<TxTracker<R>>,
        events: mpsc::Sender<CoreEvent>,
    ) -> Self {
        DirectExecutor { signer, rpc, nonce_manager, tracker, events }
    }

    #[instrument(skip(self, params, cancel), fields(request_id = %params.request_id))]
    pub async fn submit(&self, params: TxRequestParams, cancel: &CancellationToken) -> Result<alloy::primitives::B256, CoreError> {
        let request_id = params.request_id.clone();
        match run_pipeline(self.signer.as_ref(), self.rpc.as_ref(), self.nonce_manager.as_ref(), params, cancel).await {
            Ok(submitted) => {
                let _ = self
                    .events
                    .send(CoreEvent::Mempooled { request_id: request_id.clone(), tx_hash: submitted.tx_hash })
                    .await;
                self.tracker.track(submitted.tx_hash, Some(request_id));
                Ok(submitted.tx_hash)
            }
            Err(err) => {
                let _ = self
                    .events
                    .send(CoreEvent::Error { request_id, error: EventError::from(&err) })
                    .await;
                Err(err)
            }
        }
    }

    /// There is no queued slot in the direct executor to cancel; always
    /// returns `false` (adopted Open Question decision, see DESIGN.md).
    pub fn try_cancel(&self, _request_id: &str) -> bool {
        false
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

    #[tokio::test]
    async fn happy_path_emits_mempooled_then_tx_successful() {
        let from = Address::repeat_byte(0xA);
        let rpc = Arc::new(FakeRpc::new(42));
        let signer = Arc::new(FakeSigner::new(from));
        let nonce_manager = Arc::new(NonceManager::new(rpc.clone()));
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let clock = Arc::new(FakeClock::new());
        let tracker = Arc::new(TxTracker::new(rpc.clone(), clock, Duration::from_millis(5), events_tx.clone()));
        let executor = DirectExecutor::new(signer, rpc.clone(), nonce_manager, tracker, events_tx);

        let cancel = CancellationToken::new();
        let tx_hash = executor.submit(make_params("r1", from), &cancel).await.unwrap();

        rpc.set_receipt(tx_hash, Receipt { tx_hash, status: 1, block_number: 1, gas_used: 21_000 });

        let mempooled = events_rx.recv().await.unwrap();
        assert!(matches!(mempooled, CoreEvent::Mempooled { .. }));
        let success = tokio::time::timeout(Duration::from_secs(1), events_rx.recv()).await.unwrap().unwrap();
        assert!(matches!(success, CoreEvent::TxSuccessful { .. }));
    }

    #[tokio::test]
    async fn estimate_failure_keeps_nonce_cursor_unchanged_then_next_submit_uses_it() {
        let from = Address::repeat_byte(0xB);
        let rpc = Arc::new(FakeRpc::new(7));
        let signer = Arc::new(FakeSigner::new(from));
        let nonce_manager = Arc::new(NonceManager::new(rpc.clone()));
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let clock = Arc::new(FakeClock::new());
        let tracker = Arc::new(TxTracker::new(rpc.clone(), clock, Duration::from_millis(5), events_tx.clone()));
        let executor = DirectExecutor::new(signer, rpc.clone(), nonce_manager, tracker, events_tx);

        rpc.queue_estimate_failure();
        let cancel = CancellationToken::new();

        let err = executor.submit(make_params("r1", from), &cancel).await.unwrap_err();
        assert!(matches!(err, CoreError::GasEstimate { .. }));
        let event = events_rx.recv().await.unwrap();
        assert!(matches!(event, CoreEvent::Error { .. }));

        let tx_hash = executor.submit(make_params("r2", from), &cancel).await.unwrap();
        rpc.set_receipt(tx_hash, Receipt { tx_hash, status: 1, block_number: 1, gas_used: 21_000 });
        let mempooled = events_rx.recv().await.unwrap();
        assert!(matches!(mempooled, CoreEvent::Mempooled { .. }));
    }

    /// A "nonce too low" send failure must forget the in-memory cursor so
    /// the next submit re-seeds from chain rather than replaying the same
    /// stale nonce (scenario 5).
    #[tokio::test]
    async fn nonce_too_low_send_failure_forgets_cursor_and_next_submit_reseeds() {
        let from = Address::repeat_byte(0xE);
        let rpc = Arc::new(FakeRpc::new(3));
        let signer = Arc::new(FakeSigner::new(from));
        let nonce_manager = Arc::new(NonceManager::new(rpc.clone()));
        let (events_tx, mut events_rx) = mpsc::channel(16);
        let clock = Arc::new(FakeClock::new());
        let tracker = Arc::new(TxTracker::new(rpc.clone(), clock, Duration::from_millis(5), events_tx.clone()));
        let executor = DirectExecutor::new(signer, rpc.clone(), nonce_manager, tracker, events_tx);

        rpc.queue_send_failure("nonce too low");
        let cancel = CancellationToken::new();

        let err = executor.submit(make_params("r1", from), &cancel).await.unwrap_err();
        assert!(matches!(err, CoreError::TxSend { .. }));
        let event = events_rx.recv().await.unwrap();
        assert!(matches!(event, CoreEvent::Error { .. }));

        // Chain's nonce has since advanced past the stale cursor; only a
        // forgotten-and-reseeded cursor would pick this up.
        rpc.nonce_seed.store(9, std::sync::atomic::Ordering::SeqCst);

        let tx_hash = executor.submit(make_params("r2", from), &cancel).await.unwrap();
        rpc.set_receipt(tx_hash, Receipt { tx_hash, status: 1, block_number: 1, gas_used: 21_000 });
        let mempooled = events_rx.recv().await.unwrap();
        assert!(matches!(mempooled, CoreEvent::Mempooled { .. }));
    }
}
