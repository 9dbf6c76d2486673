use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::CoreError;
use crate::tx::TxRequestParams;

/// Fallback used by call sites that build a `CallSequencer` directly rather
/// than through `CallSequencerRegistry::get_or_spawn` (SPEC_FULL §4.2
/// default). Production wiring takes the configured value from
/// `SdkConfig::sequencer::queue_capacity` instead.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Per-enqueued-call lifecycle state (SPEC_FULL §3). `try_cancel` can only
/// move a slot out of `Queued`; every other transition is driven by the
/// worker loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Queued,
    Submitting,
    Mempool,
    Completed,
    Canceled,
    Failed,
}

/// Result handed back through a slot's `oneshot` once the worker has run
/// the submit step (or the slot was canceled first).
pub enum SubmitOutcome<T> {
    Submitted(T),
    Canceled,
    Failed(CoreError),
}

struct SlotMsg<T> {
    request_id: String,
    params: TxRequestParams,
    reply: oneshot::Sender<SubmitOutcome<T>>,
    state: Arc<Mutex<SlotState>>,
}

/// Bounded FIFO per signer. `enqueue` suspends (cooperative back-pressure)
/// when the channel is full; a single worker task drains the channel,
/// running the injected `submit` closure for each slot in order and only
/// pulling the next slot once the current one's `complete()` has been
/// called by the caller (this is what gives "at most one in-flight mempool
/// tx per sequencer", P4).
pub struct CallSequencer<T: Send + 'static> {
    sender: mpsc::Sender<SlotMsg<T>>,
    states: Arc<DashMap<String, Arc<Mutex<SlotState>>>>,
    complete_tx: Arc<DashMap<String, oneshot::Sender<()>>>,
}

impl<T: Send + 'static> CallSequencer<T> {
    /// `submit` runs the executor's inner pipeline for one slot; the worker
    /// awaits the paired `complete_rx` (fulfilled once the caller observes
    /// the mempool result, typically via the tracker) before dequeuing the
    /// next slot.
    pub fn spawn<F, Fut>(submit: F) -> Arc<Self>
    where
        F: Fn(TxRequestParams, Arc<Mutex<SlotState>>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        Self::spawn_with_capacity(DEFAULT_QUEUE_CAPACITY, submit)
    }

    /// Same as [`spawn`](Self::spawn) but with an explicit bounded-channel
    /// capacity, so callers can honor `SdkConfig::sequencer::queue_capacity`
    /// instead of the spec default.
    pub fn spawn_with_capacity<F, Fut>(capacity: usize, submit: F) -> Arc<Self>
    where
        F: Fn(TxRequestParams, Arc<Mutex<SlotState>>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<SlotMsg<T>>(capacity);
        let states: Arc<DashMap<String, Arc<Mutex<SlotState>>>> = Arc::new(DashMap::new());
        let complete_tx: Arc<DashMap<String, oneshot::Sender<()>>> = Arc::new(DashMap::new());
        let complete_tx_worker = complete_tx.clone();

        tokio::spawn(async move {
            while let Some(msg) = receiver.recv().await {
                let already_canceled = { *msg.state.lock().await == SlotState::Canceled };
                if already_canceled {
                    let _ = msg.reply.send(SubmitOutcome::Canceled);
                    continue;
                }

                *msg.state.lock().await = SlotState::Submitting;
                let result = submit(msg.params, msg.state.clone()).await;

                match result {
                    Ok(value) => {
                        *msg.state.lock().await = SlotState::Mempool;
                        let (done_tx, done_rx) = oneshot::channel();
                        complete_tx_worker.insert(msg.request_id.clone(), done_tx);
                        let _ = msg.reply.send(SubmitOutcome::Submitted(value));
                        // Wait for the caller (typically the queued executor,
                        // driven by the tracker) to call `complete()` before
                        // moving on to the next slot — this is the mempool
                        // serialization guarantee.
                        let _ = done_rx.await;
                        *msg.state.lock().await = SlotState::Completed;
                        complete_tx_worker.remove(&msg.request_id);
                    }
                    Err(err) => {
                        *msg.state.lock().await = SlotState::Failed;
                        let _ = msg.reply.send(SubmitOutcome::Failed(err));
                    }
                }
            }
        });

        Arc::new(CallSequencer { sender, states, complete_tx })
    }

    #[instrument(skip(self, params), fields(request_id = %params.request_id))]
    pub async fn enqueue(&self, params: TxRequestParams, cancel: &CancellationToken) -> SubmitOutcome<T> {
        let request_id = params.request_id.clone();
        let state = Arc::new(Mutex::new(SlotState::Queued));
        self.states.insert(request_id.clone(), state.clone());

        let (reply_tx, reply_rx) = oneshot::channel();
        let msg = SlotMsg { request_id: request_id.clone(), params, reply: reply_tx, state };

        let send_result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.states.remove(&request_id);
                return SubmitOutcome::Canceled;
            }
            result = self.sender.send(msg) => result,
        };

        if send_result.is_err() {
            self.states.remove(&request_id);
            return SubmitOutcome::Failed(CoreError::QueueFull);
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.try_cancel(&request_id).await;
                SubmitOutcome::Canceled
            }
            result = reply_rx => result.unwrap_or(SubmitOutcome::Canceled),
        };
        self.states.remove(&request_id);
        outcome
    }

    /// Succeeds only if the slot is still `Queued`. Returns `true` exactly
    /// once per request; a mempooled or already-resolved slot cannot be
    /// recalled.
    #[instrument(skip(self))]
    pub async fn try_cancel(&self, request_id: &str) -> bool {
        let Some(state) = self.states.get(request_id).map(|e| e.clone()) else {
            return false;
        };
        let mut guard = state.lock().await;
        if *guard == SlotState::Queued {
            *guard = SlotState::Canceled;
            true
        } else {
            false
        }
    }

    /// Releases the worker to pull the next slot. Called once the submitted
    /// transaction's lifecycle has reached a terminal state (receipt
    /// observed, or the tracker gave up).
    pub fn complete(&self, request_id: &str) {
        if let Some((_, sender)) = self.complete_tx.remove(request_id) {
            let _ = sender.send(());
        }
    }
}

/// Identity key for the process-wide sequencer registry: a signer address
/// plus a pointer-identity tag for the injected `RpcCap`, so the same
/// `(signer, rpc)` pair always maps to the same sequencer instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequencerKey {
    pub signer: alloy::primitives::Address,
    pub rpc_identity: usize,
}

impl SequencerKey {
    pub fn new<R>(signer: alloy::primitives::Address, rpc: &Arc<R>) -> Self {
        SequencerKey { signer, rpc_identity: Arc::as_ptr(rpc) as usize }
    }
}

/// Process-wide registry returning the same `CallSequencer` for the same
/// `(signer, rpc)` pair, expressed as an explicit dependency-injected
/// object rather than a module-level mutable map.
pub struct CallSequencerRegistry<T: Send + 'static> {
    sequencers: DashMap<SequencerKey, Arc<CallSequencer<T>>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> Default for CallSequencerRegistry<T> {
    fn default() -> Self {
        CallSequencerRegistry { sequencers: DashMap::new(), next_id: AtomicU64::new(0) }
    }
}

impl<T: Send + 'static> CallSequencerRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_spawn<F, Fut>(&self, key: SequencerKey, submit: F) -> Arc<CallSequencer<T>>
    where
        F: Fn(TxRequestParams, Arc<Mutex<SlotState>>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        self.get_or_spawn_with_capacity(key, DEFAULT_QUEUE_CAPACITY, submit)
    }

    /// Same as [`get_or_spawn`](Self::get_or_spawn) but with an explicit
    /// queue capacity for newly spawned sequencers; an existing sequencer
    /// for `key` is returned unchanged regardless of `capacity`.
    pub fn get_or_spawn_with_capacity<F, Fut>(
        &self,
        key: SequencerKey,
        capacity: usize,
        submit: F,
    ) -> Arc<CallSequencer<T>>
    where
        F: Fn(TxRequestParams, Arc<Mutex<SlotState>>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        if let Some(existing) = self.sequencers.get(&key) {
            return existing.clone();
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        info!(sequencer_id = id, capacity, "spawning new CallSequencer");
        let sequencer = CallSequencer::spawn_with_capacity(capacity, submit);
        self.sequencers.entry(key).or_insert(sequencer).clone()
    }
}

impl<T: Send + 'static> Drop for CallSequencer<T> {
    fn drop(&mut self) {
        if !self.complete_tx.is_empty() {
            warn!("CallSequencer dropped with in-flight completions outstanding");
        }
    }
}
