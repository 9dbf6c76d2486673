use thiserror::Error;

/// Typed error surface for the submission core. Every variant carries the
/// numeric `code` that also appears on the `Error` event (see [`crate::events::CoreEvent`]),
/// so a caller can match on `code` without downcasting.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("nonce fetch failed for {address}: {source}")]
    NonceFetch {
        address: alloy::primitives::Address,
        #[source]
        source: anyhow::Error,
    },

    #[error("gas estimation failed: {source}")]
    GasEstimate {
        #[source]
        source: anyhow::Error,
    },

    #[error("transaction signing failed: {source}")]
    TxSign {
        #[source]
        source: anyhow::Error,
    },

    #[error("signed transaction failed self-verification")]
    TxVerify,

    #[error("send_raw_transaction failed: {source}")]
    TxSend {
        #[source]
        source: anyhow::Error,
    },

    #[error("receipt polling failed for {tx_hash}: {source}")]
    TrackerPoll {
        tx_hash: alloy::primitives::B256,
        #[source]
        source: anyhow::Error,
    },

    #[error("operation canceled")]
    Canceled,

    #[error("sequencer queue full, request dropped before submission")]
    QueueFull,
}

impl CoreError {
    /// Numeric code matching the event-surface codes in SPEC_FULL §6/§7.
    pub fn code(&self) -> i32 {
        match self {
            CoreError::TxSend { .. } => 1,
            CoreError::TxVerify => 2,
            CoreError::NonceFetch { .. } => 3,
            CoreError::GasEstimate { .. } => 4,
            CoreError::TrackerPoll { .. } => 5,
            CoreError::Canceled => 6,
            CoreError::QueueFull => 7,
            CoreError::TxSign { .. } => 8,
        }
    }
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
