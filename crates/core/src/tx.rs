use alloy::primitives::{Address, Bytes, U256};

/// Variant tag for the two transaction fee shapes the core understands.
/// A `TxRequest` carries exactly one of these complete at send time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GasFields {
    Legacy {
        gas_price: Option<u128>,
    },
    Eip1559 {
        max_fee_per_gas: Option<u128>,
        max_priority_fee_per_gas: Option<u128>,
    },
}

/// The pre-nonce, pre-signature intent. `nonce` and `gas_limit` are filled
/// in by the executor pipeline; everything else is set by the caller.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub chain_id: u64,
    pub gas_limit: Option<u64>,
    pub gas: GasFields,
    pub nonce: Option<u64>,
}

impl TxRequest {
    pub fn new(from: Address, to: Address, value: U256, data: Bytes, chain_id: u64, gas: GasFields) -> Self {
        TxRequest {
            from,
            to,
            value,
            data,
            chain_id,
            gas_limit: None,
            gas,
            nonce: None,
        }
    }

    /// True once `nonce` and `gas_limit` are both set and the gas fields
    /// form a complete legacy-or-1559 set — the invariant the pipeline must
    /// establish before handing the request to a `SignerCap`.
    pub fn ready_to_sign(&self) -> bool {
        if self.nonce.is_none() || self.gas_limit.is_none() {
            return false;
        }
        match &self.gas {
            GasFields::Legacy { gas_price } => gas_price.is_some(),
            GasFields::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => {
                max_fee_per_gas.is_some() && max_priority_fee_per_gas.is_some()
            }
        }
    }
}

/// The unit enqueued by callers: a `TxRequest` plus submission policy.
#[derive(Debug, Clone)]
pub struct TxRequestParams {
    pub request_id: String,
    pub tx: TxRequest,
    pub estimate_gas: bool,
    pub gas_reserve_percent: u32,
}

impl TxRequestParams {
    pub fn new(request_id: impl Into<String>, tx: TxRequest) -> Self {
        TxRequestParams {
            request_id: request_id.into(),
            tx,
            estimate_gas: true,
            gas_reserve_percent: 0,
        }
    }

    pub fn with_gas_reserve_percent(mut self, pct: u32) -> Self {
        self.gas_reserve_percent = pct;
        self
    }

    pub fn without_gas_estimation(mut self) -> Self {
        self.estimate_gas = false;
        self
    }

    /// Applies a surplus to an estimated gas amount: `estimate + estimate * pct / 100`.
    pub fn apply_reserve(&self, estimated: u64) -> u64 {
        let reserve = (estimated as u128 * self.gas_reserve_percent as u128) / 100;
        estimated.saturating_add(reserve as u64)
    }
}

/// Output of `SignerCap::sign`: RLP (legacy) or EIP-2718 typed-envelope
/// (0x02, EIP-1559) encoded bytes, ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone)]
pub struct SignedTx {
    pub raw: Bytes,
    pub from: Address,
}
