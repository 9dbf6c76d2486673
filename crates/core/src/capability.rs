use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::events::Receipt;
use crate::tx::{SignedTx, TxRequest};

/// Block tag passed to `RpcCap::get_nonce`; the core only ever needs
/// "pending" (the teacher's `ProviderManager` calls always read pending
/// state for nonce purposes) but keeps this explicit rather than hard-coding
/// a string in the trait signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Pending,
    Latest,
}

/// Opaque signing capability. A concrete implementation (e.g. `AlloySigner`
/// in `clob-chain`) wraps a local private key; the core never sees key
/// material, only this trait.
#[async_trait]
pub trait SignerCap: Send + Sync {
    fn address(&self) -> Address;

    async fn sign(&self, tx: &TxRequest) -> anyhow::Result<SignedTx>;

    /// Recovers the sender from the signed payload and compares it against
    /// `tx.from` — the pipeline's self-verification check before send.
    fn verify(&self, signed: &SignedTx) -> bool;
}

/// Outbound JSON-RPC capability. `RpcCap` is the only point where the core
/// touches chain state.
#[async_trait]
pub trait RpcCap: Send + Sync {
    async fn get_nonce(&self, address: Address, tag: BlockTag) -> anyhow::Result<u64>;

    async fn estimate_gas(&self, tx: &TxRequest) -> anyhow::Result<u64>;

    async fn send_raw(&self, raw: &[u8]) -> anyhow::Result<B256>;

    async fn get_receipt(&self, tx_hash: B256) -> anyhow::Result<Option<Receipt>>;

    async fn send_many(&self, raws: Vec<Vec<u8>>) -> Vec<anyhow::Result<B256>> {
        let mut out = Vec::with_capacity(raws.len());
        for raw in raws {
            out.push(self.send_raw(&raw).await);
        }
        out
    }
}

/// Explicit time capability so the pipeline and the tracker stay
/// deterministically testable under a fake clock.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;

    /// Sleeps for `duration`, returning early if `cancel` fires first.
    /// Returns `true` if the delay elapsed, `false` if canceled.
    async fn delay(&self, duration: std::time::Duration, cancel: &CancellationToken) -> bool;
}

#[cfg(test)]
pub mod fakes {
    use super::*;
    use dashmap::DashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    /// Deterministic clock: `delay` never actually sleeps, it just checks
    /// whether `cancel` is already canceled, so fake-clock-driven tests run
    /// instantly.
    pub struct FakeClock {
        now: AtomicU64,
    }

    impl FakeClock {
        pub fn new() -> Self {
            FakeClock { now: AtomicU64::new(0) }
        }

        pub fn advance(&self, ms: u64) {
            self.now.fetch_add(ms, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Clock for FakeClock {
        fn now_ms(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }

        async fn delay(&self, _duration: std::time::Duration, cancel: &CancellationToken) -> bool {
            if cancel.is_cancelled() {
                return false;
            }
            tokio::task::yield_now().await;
            !cancel.is_cancelled()
        }
    }

    pub struct FakeSigner {
        address: Address,
    }

    impl FakeSigner {
        pub fn new(address: Address) -> Self {
            FakeSigner { address }
        }
    }

    #[async_trait]
    impl SignerCap for FakeSigner {
        fn address(&self) -> Address {
            self.address
        }

        async fn sign(&self, tx: &TxRequest) -> anyhow::Result<SignedTx> {
            let nonce = tx.nonce.unwrap_or_default();
            let raw = format!("signed:{}:{}", tx.from, nonce).into_bytes();
            Ok(SignedTx { raw: raw.into(), from: tx.from })
        }

        fn verify(&self, signed: &SignedTx) -> bool {
            signed.from == self.address
        }
    }

    /// Scripted RPC fake: nonce seed, and queues of errors/results that
    /// `estimate_gas`/`send_raw`/`get_receipt` consume in order, letting
    /// tests inject exactly one failure at a given step (P6).
    pub struct FakeRpc {
        pub nonce_seed: AtomicU64,
        pub estimate_failures: Arc<parking_lot::Mutex<Vec<bool>>>,
        pub send_failures: Arc<parking_lot::Mutex<Vec<Option<String>>>>,
        pub receipts: DashMap<B256, Receipt>,
        pub sent: Arc<parking_lot::Mutex<Vec<B256>>>,
        next_hash: AtomicU64,
    }

    impl FakeRpc {
        pub fn new(nonce_seed: u64) -> Self {
            FakeRpc {
                nonce_seed: AtomicU64::new(nonce_seed),
                estimate_failures: Arc::new(parking_lot::Mutex::new(Vec::new())),
                send_failures: Arc::new(parking_lot::Mutex::new(Vec::new())),
                receipts: DashMap::new(),
                sent: Arc::new(parking_lot::Mutex::new(Vec::new())),
                next_hash: AtomicU64::new(1),
            }
        }

        pub fn queue_estimate_failure(&self) {
            self.estimate_failures.lock().push(true);
        }

        pub fn queue_send_failure(&self, message: impl Into<String>) {
            self.send_failures.lock().push(Some(message.into()));
        }

        pub fn set_receipt(&self, tx_hash: B256, receipt: Receipt) {
            self.receipts.insert(tx_hash, receipt);
        }
    }

    #[async_trait]
    impl RpcCap for FakeRpc {
        async fn get_nonce(&self, _address: Address, _tag: BlockTag) -> anyhow::Result<u64> {
            Ok(self.nonce_seed.load(Ordering::SeqCst))
        }

        async fn estimate_gas(&self, _tx: &TxRequest) -> anyhow::Result<u64> {
            if self.estimate_failures.lock().pop().is_some() {
                anyhow::bail!("estimate_gas failed (fake)");
            }
            Ok(21_000)
        }

        async fn send_raw(&self, _raw: &[u8]) -> anyhow::Result<B256> {
            if let Some(Some(message)) = self.send_failures.lock().pop() {
                anyhow::bail!(message);
            }
            let n = self.next_hash.fetch_add(1, Ordering::SeqCst);
            let mut bytes = [0u8; 32];
            bytes[24..].copy_from_slice(&n.to_be_bytes());
            let hash = B256::from(bytes);
            self.sent.lock().push(hash);
            Ok(hash)
        }

        async fn get_receipt(&self, tx_hash: B256) -> anyhow::Result<Option<Receipt>> {
            Ok(self.receipts.get(&tx_hash).map(|r| r.clone()))
        }
    }
}
