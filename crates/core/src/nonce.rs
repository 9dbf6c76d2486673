use std::sync::Arc;

use alloy::primitives::Address;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::capability::{BlockTag, RpcCap};
use crate::error::CoreError;

/// Per-address nonce cursor. The map holding these is keyed by `Address`;
/// the `Arc<Mutex<_>>` indirection (rather than a bare `Mutex` in the map
/// value) lets `lock()` clone the handle out of a short-lived `DashMap`
/// borrow before awaiting, mirroring `alloy`'s own `NonceFiller`.
struct AddressCursor {
    next: u64,
}

/// Scoped exclusive borrow of one address's nonce cursor. `next_nonce()`
/// returns the current cursor value and post-increments it; `reset(n)`
/// rolls the cursor back without finalizing the increment. Dropping the
/// lease without calling `reset` finalizes whatever `next_nonce()` already
/// advanced past.
pub struct NonceLease {
    guard: OwnedMutexGuard<AddressCursor>,
    address: Address,
}

impl NonceLease {
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn next_nonce(&mut self) -> u64 {
        let n = self.guard.next;
        self.guard.next += 1;
        n
    }

    /// Rolls the cursor back to `min(cursor, n)` so that a failed post-nonce
    /// step (estimate/sign/send) never leaves a gap for a future lease.
    pub fn reset(&mut self, n: u64) {
        if n < self.guard.next {
            self.guard.next = n;
        }
    }
}

/// Per-address exclusive nonce issuance with chain-refresh-on-first-use and
/// a one-re-seed-per-failure policy for "nonce too low" recovery.
pub struct NonceManager<R: RpcCap> {
    rpc: Arc<R>,
    cursors: DashMap<Address, Arc<Mutex<AddressCursor>>>,
}

impl<R: RpcCap> NonceManager<R> {
    pub fn new(rpc: Arc<R>) -> Self {
        NonceManager { rpc, cursors: DashMap::new() }
    }

    /// Acquires the per-address exclusive lock, seeding the cursor from
    /// chain on first use for this address. Respects `cancel`: if the
    /// cancellation token fires before the lock (or the seeding RPC call)
    /// completes, returns `Err(CoreError::Canceled)` without issuing a lease.
    #[instrument(skip(self, cancel), fields(address = %address))]
    pub async fn lock(&self, address: Address, cancel: &CancellationToken) -> Result<NonceLease, CoreError> {
        if !self.cursors.contains_key(&address) {
            self.seed(address, cancel).await?;
        }

        let cell = self
            .cursors
            .get(&address)
            .map(|entry| entry.clone())
            .expect("cursor inserted by seed() just above");

        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Canceled),
            guard = cell.lock_owned() => guard,
        };

        Ok(NonceLease { guard, address })
    }

    async fn seed(&self, address: Address, cancel: &CancellationToken) -> Result<(), CoreError> {
        let fetched = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CoreError::Canceled),
            result = self.rpc.get_nonce(address, BlockTag::Pending) => result,
        };

        let next = fetched.map_err(|source| CoreError::NonceFetch { address, source })?;
        debug!(next, "seeded nonce cursor from chain");
        self.cursors
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(AddressCursor { next })));
        Ok(())
    }

    /// Drops the in-memory cursor for `address` so the next `lock()`
    /// re-seeds from chain. Used after a "nonce too low" send error.
    #[instrument(skip(self), fields(address = %address))]
    pub fn forget(&self, address: Address) {
        warn!("forgetting nonce cursor, next lock will re-seed from chain");
        self.cursors.remove(&address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::fakes::FakeRpc;

    #[tokio::test]
    async fn lock_seeds_from_chain_on_first_use() {
        let rpc = Arc::new(FakeRpc::new(42));
        let manager = NonceManager::new(rpc);
        let addr = Address::repeat_byte(1);
        let cancel = CancellationToken::new();

        let mut lease = manager.lock(addr, &cancel).await.unwrap();
        assert_eq!(lease.next_nonce(), 42);
        assert_eq!(lease.next_nonce(), 43);
    }

    #[tokio::test]
    async fn reset_rolls_cursor_back_without_regressing_past_prior_reset() {
        let rpc = Arc::new(FakeRpc::new(10));
        let manager = NonceManager::new(rpc);
        let addr = Address::repeat_byte(2);
        let cancel = CancellationToken::new();

        {
            let mut lease = manager.lock(addr, &cancel).await.unwrap();
            assert_eq!(lease.next_nonce(), 10);
            lease.reset(10);
        }
        {
            let mut lease = manager.lock(addr, &cancel).await.unwrap();
            assert_eq!(lease.next_nonce(), 10);
        }
    }

    #[tokio::test]
    async fn at_most_one_lease_outstanding_per_address() {
        let rpc = Arc::new(FakeRpc::new(0));
        let manager = Arc::new(NonceManager::new(rpc));
        let addr = Address::repeat_byte(3);
        let cancel = CancellationToken::new();

        let lease = manager.lock(addr, &cancel).await.unwrap();

        let manager2 = manager.clone();
        let cancel2 = cancel.clone();
        let handle = tokio::spawn(async move {
            let start = std::time::Instant::now();
            let _second = manager2.lock(addr, &cancel2).await.unwrap();
            start.elapsed()
        });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(lease);
        let elapsed = handle.await.unwrap();
        assert!(elapsed >= std::time::Duration::from_millis(15));
    }

    #[tokio::test]
    async fn forget_forces_reseed_on_next_lock() {
        let rpc = Arc::new(FakeRpc::new(5));
        let manager = NonceManager::new(rpc);
        let addr = Address::repeat_byte(4);
        let cancel = CancellationToken::new();

        {
            let mut lease = manager.lock(addr, &cancel).await.unwrap();
            assert_eq!(lease.next_nonce(), 5);
        }
        manager.forget(addr);
        manager.rpc.nonce_seed.store(99, std::sync::atomic::Ordering::SeqCst);
        {
            let mut lease = manager.lock(addr, &cancel).await.unwrap();
            assert_eq!(lease.next_nonce(), 99);
        }
    }
}
