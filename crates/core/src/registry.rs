use alloy::primitives::B256;
use dashmap::DashMap;

/// Maps caller-provided request ids to the information needed to cancel a
/// request before submission or correlate tracker events afterwards:
/// the tx hash once known, and whether the request ever reached mempool.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub request_id: String,
    pub tx_hash: Option<B256>,
}

#[derive(Default)]
pub struct PendingRequestRegistry {
    by_request_id: DashMap<String, PendingRequest>,
    by_tx_hash: DashMap<B256, String>,
}

impl PendingRequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, request_id: String) {
        self.by_request_id
            .insert(request_id.clone(), PendingRequest { request_id, tx_hash: None });
    }

    /// Called once the executor pipeline learns the tx hash for a request,
    /// populating the correlation map the queued executor uses to route
    /// tracker events back to `CallSequencer::complete`.
    pub fn mark_mempooled(&self, request_id: &str, tx_hash: B256) {
        if let Some(mut entry) = self.by_request_id.get_mut(request_id) {
            entry.tx_hash = Some(tx_hash);
        }
        self.by_tx_hash.insert(tx_hash, request_id.to_string());
    }

    pub fn request_id_for_hash(&self, tx_hash: &B256) -> Option<String> {
        self.by_tx_hash.get(tx_hash).map(|e| e.clone())
    }

    /// Removes all bookkeeping for a request once it has reached a terminal
    /// state (confirmed, failed, canceled, or errored).
    pub fn remove(&self, request_id: &str) {
        if let Some((_, pending)) = self.by_request_id.remove(request_id) {
            if let Some(tx_hash) = pending.tx_hash {
                self.by_tx_hash.remove(&tx_hash);
            }
        }
    }

    pub fn get(&self, request_id: &str) -> Option<PendingRequest> {
        self.by_request_id.get(request_id).map(|e| e.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mempooled_entries_are_findable_by_hash_and_removable() {
        let registry = PendingRequestRegistry::new();
        registry.register("r1".to_string());
        let hash = B256::repeat_byte(5);
        registry.mark_mempooled("r1", hash);

        assert_eq!(registry.request_id_for_hash(&hash), Some("r1".to_string()));
        registry.remove("r1");
        assert_eq!(registry.request_id_for_hash(&hash), None);
        assert!(registry.get("r1").is_none());
    }
}
