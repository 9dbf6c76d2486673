//! Concrete `SignerCap` backed by a local private key.

use alloy::consensus::{SignableTransaction, TxEnvelope};
use alloy::network::{EthereumWallet, TxSignerSync};
use alloy::primitives::{Address, PrimitiveSignature, TxKind};
use alloy::rlp::{Decodable, Encodable};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use clob_core::capability::SignerCap;
use clob_core::tx::{GasFields, SignedTx, TxRequest};
use tracing::instrument;

/// Wraps a local private key signer exactly as the teacher's
/// `TransactionSender::new` constructs its wallet from a hex private key.
/// `verify()` recovers the sender from the signed payload and compares it
/// to the declared `from` — the pipeline's cheap self-verification check.
pub struct AlloySigner {
    signer: PrivateKeySigner,
    #[allow(dead_code)]
    wallet: EthereumWallet,
    address: Address,
}

impl AlloySigner {
    pub fn from_private_key(private_key: &str) -> anyhow::Result<Self> {
        let key_str = private_key.trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str.parse()?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer.clone());
        Ok(AlloySigner { signer, wallet, address })
    }
}

#[async_trait]
impl SignerCap for AlloySigner {
    fn address(&self) -> Address {
        self.address
    }

    #[instrument(skip(self, tx), fields(from = %tx.from, nonce = ?tx.nonce))]
    async fn sign(&self, tx: &TxRequest) -> anyhow::Result<SignedTx> {
        let nonce = tx.nonce.ok_or_else(|| anyhow::anyhow!("nonce not set before signing"))?;
        let gas_limit = tx.gas_limit.ok_or_else(|| anyhow::anyhow!("gas_limit not set before signing"))?;

        let raw = match &tx.gas {
            GasFields::Legacy { gas_price } => {
                let gas_price = gas_price.ok_or_else(|| anyhow::anyhow!("gas_price not set"))?;
                let mut unsigned = alloy::consensus::TxLegacy {
                    chain_id: Some(tx.chain_id),
                    nonce,
                    gas_price,
                    gas_limit,
                    to: TxKind::Call(tx.to),
                    value: tx.value,
                    input: tx.data.clone(),
                };
                let signature: PrimitiveSignature = self.signer.sign_transaction_sync(&mut unsigned)?;
                let envelope = TxEnvelope::Legacy(unsigned.into_signed(signature));
                let mut out = Vec::new();
                envelope.encode(&mut out);
                out
            }
            GasFields::Eip1559 { max_fee_per_gas, max_priority_fee_per_gas } => {
                let max_fee_per_gas = max_fee_per_gas.ok_or_else(|| anyhow::anyhow!("max_fee_per_gas not set"))?;
                let max_priority_fee_per_gas = max_priority_fee_per_gas
                    .ok_or_else(|| anyhow::anyhow!("max_priority_fee_per_gas not set"))?;
                let mut unsigned = alloy::consensus::TxEip1559 {
                    chain_id: tx.chain_id,
                    nonce,
                    gas_limit,
                    max_fee_per_gas,
                    max_priority_fee_per_gas,
                    to: TxKind::Call(tx.to),
                    value: tx.value,
                    input: tx.data.clone(),
                    access_list: Default::default(),
                };
                let signature: PrimitiveSignature = self.signer.sign_transaction_sync(&mut unsigned)?;
                let envelope = TxEnvelope::Eip1559(unsigned.into_signed(signature));
                let mut out = Vec::new();
                envelope.encode(&mut out);
                out
            }
        };

        Ok(SignedTx { raw: raw.into(), from: tx.from })
    }

    /// Decodes `signed.raw` back into its envelope and ECDSA-recovers the
    /// sender, comparing it to the declared `from` — catches a corrupted
    /// encoding or a signature that doesn't match the declared sender
    /// before the pipeline ever calls `send_raw`.
    fn verify(&self, signed: &SignedTx) -> bool {
        let mut slice = signed.raw.as_ref();
        let envelope = match TxEnvelope::decode(&mut slice) {
            Ok(envelope) => envelope,
            Err(error) => {
                tracing::warn!(%error, "failed to decode signed envelope during verification");
                return false;
            }
        };
        match envelope.recover_signer() {
            Ok(recovered) => recovered == signed.from,
            Err(error) => {
                tracing::warn!(%error, "failed to recover signer during verification");
                false
            }
        }
    }
}
