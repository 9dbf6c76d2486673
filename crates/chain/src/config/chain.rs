//! Chain configuration: RPC endpoints and gas pricing model.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain: ChainDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainDetails {
    pub chain_id: u64,
    pub name: String,
    pub native_token: String,
    pub block_time_ms: u64,
    #[serde(default)]
    pub explorer_url: Option<String>,
    pub rpc: RpcConfig,
    pub gas: GasConfig,
}

impl ChainDetails {
    pub fn block_time(&self) -> Duration {
        Duration::from_millis(self.block_time_ms)
    }
}

/// RPC endpoint configuration, matching `ProviderManager`'s endpoint split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub http: String,
    #[serde(default)]
    pub ws: String,
    #[serde(default)]
    pub archive: Option<String>,
    /// Dedicated send endpoint for faster tx submission, if configured.
    #[serde(default)]
    pub send: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    pub pricing: GasPricingModel,
    #[serde(default = "default_limit_multiplier")]
    pub limit_multiplier: f64,
    #[serde(default = "default_max_gas_price")]
    pub max_gas_price_gwei: f64,
    #[serde(default = "default_gas_price")]
    pub default_gas_price_gwei: f64,
    #[serde(default)]
    pub priority_fee_gwei: Option<f64>,
}

fn default_limit_multiplier() -> f64 {
    1.1
}

fn default_max_gas_price() -> f64 {
    100.0
}

fn default_gas_price() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GasPricingModel {
    Legacy,
    Eip1559,
    Custom,
}

impl GasPricingModel {
    /// Matches the strings `gas::create_gas_strategy` branches on.
    pub fn as_str(&self) -> &'static str {
        match self {
            GasPricingModel::Legacy => "Legacy",
            GasPricingModel::Eip1559 => "Eip1559",
            GasPricingModel::Custom => "Custom",
        }
    }
}

impl ChainConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ChainConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn expand_env_vars(&mut self) {
        self.chain.rpc.http = expand_env(&self.chain.rpc.http);
        self.chain.rpc.ws = expand_env(&self.chain.rpc.ws);
        if let Some(ref mut archive) = self.chain.rpc.archive {
            *archive = expand_env(archive);
        }
        if let Some(ref mut send) = self.chain.rpc.send {
            *send = expand_env(send);
        }
    }
}

/// Expand `${VAR_NAME}` patterns with environment variable values.
fn expand_env(s: &str) -> String {
    let mut result = s.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(s) {
        if let (Some(full_match), Some(var_match)) = (cap.get(0), cap.get(1)) {
            let var_name = var_match.as_str();
            if let Ok(value) = std::env::var(var_name) {
                result = result.replace(full_match.as_str(), &value);
            }
        }
    }

    result
}
