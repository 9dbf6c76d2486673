use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::capability::{RpcCap, SignerCap};
use crate::error::CoreError;
use crate::nonce::NonceManager;
use crate::tx::TxRequestParams;

/// Outcome of a single pipeline attempt that reached mempool.
pub struct Submitted {
    pub tx_hash: alloy::primitives::B256,
    pub nonce: u64,
}

/// The shared single-attempt pipeline used by both executor flavours:
/// acquire nonce → optionally estimate gas → sign → verify → send.
/// No retry happens at this layer — SPEC_FULL §4.3.
#[instrument(skip_all, fields(request_id = %params.request_id))]
pub async fn run_pipeline<S, R>(
    signer: &S,
    rpc: &R,
    nonce_manager: &NonceManager<R>,
    mut params: TxRequestParams,
    cancel: &CancellationToken,
) -> Result<Submitted, CoreError>
where
    S: SignerCap,
    R: RpcCap,
{
    let start = Instant::now();
    let mut lease = nonce_manager.lock(params.tx.from, cancel).await?;
    let nonce = lease.next_nonce();
    params.tx.nonce = Some(nonce);

    if params.estimate_gas {
        match rpc.estimate_gas(&params.tx).await {
            Ok(estimated) => {
                params.tx.gas_limit = Some(params.apply_reserve(estimated));
            }
            Err(source) => {
                lease.reset(nonce);
                return Err(CoreError::GasEstimate { source });
            }
        }
    } else if params.tx.gas_limit.is_none() {
        lease.reset(nonce);
        return Err(CoreError::GasEstimate {
            source: anyhow::anyhow!("gas_limit must be preset when estimate_gas is false"),
        });
    }

    let signed = match signer.sign(&params.tx).await {
        Ok(signed) => signed,
        Err(source) => {
            lease.reset(nonce);
            return Err(CoreError::TxSign { source });
        }
    };

    if !signer.verify(&signed) {
        lease.reset(nonce);
        warn!("signed transaction failed self-verification");
        return Err(CoreError::TxVerify);
    }

    let tx_hash = match rpc.send_raw(&signed.raw).await {
        Ok(hash) => hash,
        Err(source) => {
            let from = params.tx.from;
            let is_nonce_too_low = source.to_string().to_lowercase().contains("nonce too low");
            lease.reset(nonce);
            if is_nonce_too_low {
                drop(lease);
                warn!(%from, "nonce too low on send, forgetting cursor for re-seed");
                nonce_manager.forget(from);
            }
            return Err(CoreError::TxSend { source });
        }
    };

    info!(nonce, tx_hash = %tx_hash, elapsed_ms = start.elapsed().as_millis() as u64, "submitted to mempool");
    // Lease drops here, finalizing the nonce increment.
    Ok(Submitted { tx_hash, nonce })
}

/// Convenience wrapper so callers that only have `Arc<S>`/`Arc<R>` (the
/// executor's usual shape) don't need to deref manually at every call site.
pub async fn run_pipeline_arc<S, R>(
    signer: Arc<S>,
    rpc: Arc<R>,
    nonce_manager: Arc<NonceManager<R>>,
    params: TxRequestParams,
    cancel: CancellationToken,
) -> Result<Submitted, CoreError>
where
    S: SignerCap,
    R: RpcCap,
{
    run_pipeline(signer.as_ref(), rpc.as_ref(), nonce_manager.as_ref(), params, &cancel).await
}
