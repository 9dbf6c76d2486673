use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Post-mining record of a transaction. `status` is the raw 0/1 field from
/// `eth_getTransactionReceipt`; any non-zero value counts as success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: B256,
    pub status: u64,
    pub block_number: u64,
    pub gas_used: u64,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status != 0
    }
}

/// Wire-shape of a `CoreError` for the event surface — `thiserror` values
/// don't implement `Serialize` themselves, so events carry this instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventError {
    pub code: i32,
    pub message: String,
}

impl From<&CoreError> for EventError {
    fn from(err: &CoreError) -> Self {
        EventError {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Shared typed notification surface. Every submission resolves in finite
/// time with exactly one terminal event: either a pre-mempool `Error`, or
/// `Mempooled` followed by exactly one of `TxSuccessful` / `TxFailed` /
/// tracker `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CoreEvent {
    Mempooled {
        request_id: String,
        tx_hash: B256,
    },
    TxSuccessful {
        request_id: Option<String>,
        receipt: Receipt,
    },
    TxFailed {
        request_id: Option<String>,
        receipt: Receipt,
    },
    Error {
        request_id: String,
        error: EventError,
    },
}

impl CoreEvent {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            CoreEvent::Mempooled { request_id, .. } => Some(request_id),
            CoreEvent::TxSuccessful { request_id, .. } => request_id.as_deref(),
            CoreEvent::TxFailed { request_id, .. } => request_id.as_deref(),
            CoreEvent::Error { request_id, .. } => Some(request_id),
        }
    }
}
