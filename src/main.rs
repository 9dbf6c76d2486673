//! Submission-core trader binary.
//!
//! Wires the abstract four-subsystem core (`clob-core`) to the concrete
//! Alloy collaborators (`clob-chain`) and the off-chain venue feeds
//! (`clob-api`): loads configuration, constructs a `QueuedExecutor` per
//! signer, and forwards venue market-data events alongside submission
//! lifecycle events to the log.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use alloy::primitives::{Address, U256};

use clob_api::{run_with_reconnect, MarketDataClient};
use clob_chain::{create_gas_strategy, AlloyRpc, AlloySigner, ChainConfig, GasConfig, GasParams, GasPricingModel, GasStrategy, TokioClock};
use clob_core::capability::{Clock, SignerCap};
use clob_core::{
    init_config, CallSequencerRegistry, CoreEvent, NonceManager, OrderIntent, OrderSide,
    QueuedExecutor, SdkConfig, TxRequestParams,
};

mod env {
    pub const RPC_HTTP_URL: &str = "RPC_HTTP_URL";
    pub const MARKET_DATA_WS_URL: &str = "MARKET_DATA_WS_URL";
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const CHAIN_ID: &str = "CHAIN_ID";
    pub const CLOB_MARKET: &str = "CLOB_MARKET";
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,clob_core=debug,clob_chain=debug")),
        )
        .init();

    let sdk_config = SdkConfig::from_env();
    sdk_config.log_config();
    init_config(sdk_config);

    info!("Starting CLOB trader");

    let config = load_config()?;

    let rpc = Arc::new(AlloyRpc::connect_http(&config.rpc_http_url)?);
    let signer = Arc::new(AlloySigner::from_private_key(&config.private_key)?);
    let clock: Arc<dyn Clock> = Arc::new(TokioClock::new());
    info!(address = %signer.address(), "signer loaded");

    let nonce_manager = Arc::new(NonceManager::new(rpc.clone()));
    let sequencer_registry = Arc::new(CallSequencerRegistry::new());

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel(256);
    let tracker_config = &clob_core::config().tracker;

    let executor = QueuedExecutor::new(
        signer.clone(),
        rpc.clone(),
        nonce_manager.clone(),
        clock.clone(),
        tracker_config.poll_interval(),
        sequencer_registry.clone(),
        events_tx.clone(),
    );

    tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            log_event(&event);
        }
    });

    if let Some(ws_url) = config.market_data_ws_url.clone() {
        let market = config.market;
        tokio::spawn(async move {
            let client = MarketDataClient::new(ws_url);
            let (tx, mut rx) = tokio::sync::mpsc::channel(256);
            let feed = tokio::spawn(async move { run_with_reconnect(&client, vec![market], tx).await });
            while let Some(event) = rx.recv().await {
                info!(?event, "market data update");
            }
            feed.abort();
        });
    }

    info!("submitting a sample order");
    let cancel = tokio_util::sync::CancellationToken::new();
    let intent = OrderIntent::Place {
        market: config.market,
        side: OrderSide::Bid,
        price: U256::from(1_000u64),
        quantity: U256::from(1u64),
        order_id_hint: None,
    };
    let calldata = clob_chain::encode_calldata(&intent);
    let gas_strategy = create_gas_strategy(
        config.gas.pricing.as_str(),
        config.gas.default_gas_price_gwei,
        config.gas.max_gas_price_gwei,
        config.gas.priority_fee_gwei,
    );
    let gas_price = match gas_strategy.fetch_params(&config.rpc_http_url).await {
        Ok(GasParams::Legacy { gas_price }) => gas_price,
        Ok(GasParams::Eip1559 { max_fee_per_gas, .. }) => max_fee_per_gas,
        Err(error) => {
            warn!(%error, "gas price fetch failed, using default");
            1_000_000_000
        }
    };
    let tx = clob_core::TxRequest::new(
        signer.address(),
        config.market,
        U256::ZERO,
        calldata,
        config.chain_id,
        clob_core::GasFields::Legacy { gas_price: Some(gas_price) },
    );
    let params = TxRequestParams::new(uuid_like_id(), tx)
        .with_gas_reserve_percent(clob_core::config().nonce.gas_reserve_percent);

    match executor.submit(params, &cancel).await {
        Ok(tx_hash) => info!(%tx_hash, "order submitted"),
        Err(error) => warn!(%error, "order submission failed"),
    }

    clock.delay(Duration::from_secs(3600 * 24 * 365), &cancel).await;

    Ok(())
}

struct Config {
    rpc_http_url: String,
    market_data_ws_url: Option<String>,
    private_key: String,
    chain_id: u64,
    market: Address,
    gas: GasConfig,
}

fn load_config() -> Result<Config> {
    let get_env = |name: &str| -> Result<String> {
        std::env::var(name).map_err(|_| anyhow::anyhow!("Missing env var: {}", name))
    };

    let chain_config = std::env::var("CHAIN_CONFIG_PATH")
        .ok()
        .and_then(|path| ChainConfig::from_file(&path).ok());

    let rpc_http_url = chain_config
        .as_ref()
        .map(|c| c.chain.rpc.http.clone())
        .map(Ok)
        .unwrap_or_else(|| get_env(env::RPC_HTTP_URL))?;

    let chain_id = chain_config.as_ref().map(|c| c.chain.chain_id).unwrap_or_else(|| {
        std::env::var(env::CHAIN_ID).ok().and_then(|s| s.parse().ok()).unwrap_or(1)
    });

    let gas = chain_config.as_ref().map(|c| c.chain.gas.clone()).unwrap_or(GasConfig {
        pricing: GasPricingModel::Legacy,
        limit_multiplier: 1.1,
        max_gas_price_gwei: 100.0,
        default_gas_price_gwei: 1.0,
        priority_fee_gwei: None,
    });

    Ok(Config {
        rpc_http_url,
        market_data_ws_url: std::env::var(env::MARKET_DATA_WS_URL).ok(),
        private_key: get_env(env::PRIVATE_KEY)?,
        chain_id,
        market: get_env(env::CLOB_MARKET)?.parse()?,
        gas,
    })
}

fn log_event(event: &CoreEvent) {
    match event {
        CoreEvent::Mempooled { request_id, tx_hash } => {
            info!(request_id, %tx_hash, "mempooled");
        }
        CoreEvent::TxSuccessful { request_id, receipt } => {
            info!(?request_id, tx_hash = %receipt.tx_hash, "confirmed");
        }
        CoreEvent::TxFailed { request_id, receipt } => {
            warn!(?request_id, tx_hash = %receipt.tx_hash, "reverted");
        }
        CoreEvent::Error { request_id, error } => {
            warn!(?request_id, code = error.code, message = %error.message, "submission error");
        }
    }
}

/// Cheap monotonic-ish request id without pulling in a UUID dependency for
/// a single call site; real callers should supply their own request ids.
fn uuid_like_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(1);
    format!("req-{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

fn print_banner() {
    println!(
        r#"
    ╔═╗╦  ╔═╗╔╗  ╔╦╗╦═╗╔═╗╔╦╗╔═╗╦═╗
    ║  ║  ║ ║╠╩╗  ║ ╠╦╝╠═╣ ║║║╣ ╠╦╝
    ╚═╝╩═╝╚═╝╚═╝  ╩ ╩╚═╩ ╩═╩╝╚═╝╩╚═
    "#
    );
}
