use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Bid,
    Ask,
}

/// Tagged representation of a trading intent, monomorphic at the submission
/// path instead of dynamic-dispatch contract request types. Carries an
/// implicit batching priority (`Cancel` > `Claim` > `Change` > `Place`),
/// used only to order intents within a single sequencer tick.
#[derive(Debug, Clone)]
pub enum OrderIntent {
    Place {
        market: Address,
        side: OrderSide,
        price: U256,
        quantity: U256,
        order_id_hint: Option<u64>,
    },
    Change {
        market: Address,
        order_id: u64,
        new_price: U256,
        new_quantity: U256,
    },
    Claim {
        market: Address,
        order_ids: Vec<u64>,
    },
    Cancel {
        market: Address,
        order_ids: Vec<u64>,
    },
}

impl OrderIntent {
    /// Batching priority: higher sorts first. Never used for cross-signer
    /// ordering, only for grouping within one sequencer tick.
    pub fn priority(&self) -> u8 {
        match self {
            OrderIntent::Cancel { .. } => 3,
            OrderIntent::Claim { .. } => 2,
            OrderIntent::Change { .. } => 1,
            OrderIntent::Place { .. } => 0,
        }
    }

    pub fn market(&self) -> Address {
        match self {
            OrderIntent::Place { market, .. }
            | OrderIntent::Change { market, .. }
            | OrderIntent::Claim { market, .. }
            | OrderIntent::Cancel { market, .. } => *market,
        }
    }
}
