//! Concrete `RpcCap` backed by `alloy::providers`.

use alloy::eips::BlockId;
use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, B256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::{BlockNumberOrTag, TransactionRequest};
use async_trait::async_trait;
use clob_core::capability::{BlockTag, RpcCap};
use clob_core::events::Receipt;
use clob_core::tx::{GasFields, TxRequest};
use tracing::{debug, instrument, warn};

/// Wraps a `RootProvider` built via `ProviderBuilder`, translating the
/// abstract capability calls onto `Provider::get_transaction_count`/
/// `estimate_gas`/`send_raw_transaction`/`get_transaction_receipt`, matching
/// the teacher's `ProviderManager` call shape.
pub struct AlloyRpc {
    provider: RootProvider,
    rpc_url: String,
}

impl AlloyRpc {
    pub fn connect_http(rpc_url: &str) -> anyhow::Result<Self> {
        let provider = ProviderBuilder::new().on_http(rpc_url.parse()?);
        Ok(AlloyRpc { provider, rpc_url: rpc_url.to_string() })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    fn to_tx_request(tx: &TxRequest) -> TransactionRequest {
        let mut req = TransactionRequest::default()
            .with_to(tx.to)
            .with_input(tx.data.clone())
            .with_value(tx.value)
            .with_chain_id(tx.chain_id)
            .with_from(tx.from);
        if let Some(nonce) = tx.nonce {
            req = req.with_nonce(nonce);
        }
        if let Some(gas_limit) = tx.gas_limit {
            req = req.with_gas_limit(gas_limit);
        }
        req = match &tx.gas {
            GasFields::Legacy { gas_price: Some(gas_price) } => req.with_gas_price(*gas_price),
            GasFields::Eip1559 { max_fee_per_gas: Some(max_fee), max_priority_fee_per_gas: Some(max_priority) } => {
                req.with_max_fee_per_gas(*max_fee).with_max_priority_fee_per_gas(*max_priority)
            }
            _ => req,
        };
        req
    }
}

#[async_trait]
impl RpcCap for AlloyRpc {
    #[instrument(skip(self), fields(address = %address))]
    async fn get_nonce(&self, address: Address, tag: BlockTag) -> anyhow::Result<u64> {
        let block_id = match tag {
            BlockTag::Pending => BlockId::pending(),
            BlockTag::Latest => BlockId::latest(),
        };
        let nonce = self.provider.get_transaction_count(address).block_id(block_id).await?;
        debug!(nonce, "fetched nonce");
        Ok(nonce)
    }

    async fn estimate_gas(&self, tx: &TxRequest) -> anyhow::Result<u64> {
        let req = Self::to_tx_request(tx);
        let gas = self.provider.estimate_gas(req).await?;
        Ok(gas)
    }

    #[instrument(skip(self, raw))]
    async fn send_raw(&self, raw: &[u8]) -> anyhow::Result<B256> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(*pending.tx_hash())
    }

    async fn get_receipt(&self, tx_hash: B256) -> anyhow::Result<Option<Receipt>> {
        match self.provider.get_transaction_receipt(tx_hash).await? {
            Some(receipt) => Ok(Some(Receipt {
                tx_hash,
                status: if receipt.status() { 1 } else { 0 },
                block_number: receipt.block_number.unwrap_or(0),
                gas_used: receipt.gas_used as u64,
            })),
            None => Ok(None),
        }
    }
}

/// Thin wrapper to fetch the 1559 base fee / priority fee the gas
/// strategies need; kept here rather than in `capability::RpcCap` since
/// it's chain-specific plumbing the core doesn't need to know about.
pub async fn fetch_base_fee(provider: &RootProvider) -> anyhow::Result<Option<u128>> {
    let block = provider.get_block_by_number(BlockNumberOrTag::Pending).await?;
    Ok(block.and_then(|b| b.header.base_fee_per_gas).map(|fee| fee as u128))
}

pub async fn fetch_max_priority_fee(provider: &RootProvider) -> anyhow::Result<u128> {
    provider.get_max_priority_fee_per_gas().await.map_err(|e| {
        warn!(error = %e, "failed to fetch max priority fee");
        anyhow::Error::from(e)
    })
}
