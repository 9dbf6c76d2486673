//! Concrete Alloy-backed collaborators for `clob-core`'s capability traits.
//!
//! This crate provides:
//! - `AlloySigner`: `SignerCap` backed by a local private key
//! - `AlloyRpc`: `RpcCap` backed by an `alloy::providers::RootProvider`
//! - `TokioClock`: `Clock` backed by `tokio::time`
//! - Gas pricing strategies (legacy / EIP-1559)
//! - The CLOB and ERC20 contract ABI surface
//! - Chain configuration (RPC endpoints, gas pricing model)

pub mod clock;
pub mod config;
pub mod contracts;
pub mod gas;
pub mod rpc;
pub mod signer;

pub use clock::TokioClock;
pub use config::{ChainConfig, ChainDetails, GasConfig, GasPricingModel, RpcConfig};
pub use contracts::{encode_calldata, ICentralLimitOrderBook, IERC20};
pub use gas::{create_gas_strategy, Eip1559GasStrategy, GasParams, GasStrategy, LegacyGasStrategy};
pub use rpc::AlloyRpc;
pub use signer::AlloySigner;
