//! Chain-specific configuration: RPC endpoints and gas pricing, distinct
//! from the abstract tuning knobs in `clob_core::config`.

mod chain;

pub use chain::{ChainConfig, ChainDetails, GasConfig, GasPricingModel, RpcConfig};
