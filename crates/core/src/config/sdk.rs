//! Configuration management with profile support.
//!
//! Mirrors the teacher's `BotConfig`: a profile-named struct with
//! `#[serde(default = ...)]` leaf fields, `default`/`testing`/`production`
//! constructors, env-var profile selection, and a `OnceLock`-backed global.

use std::sync::OnceLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level SDK configuration: nonce/sequencer/tracker tuning plus the
/// active profile name (for logging).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    #[serde(default = "default_profile_name")]
    pub profile: String,

    #[serde(default)]
    pub nonce: NonceConfig,

    #[serde(default)]
    pub sequencer: SequencerConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,
}

fn default_profile_name() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NonceConfig {
    /// Gas reserve surplus applied on top of an estimate, in percent.
    #[serde(default = "default_gas_reserve_percent")]
    pub gas_reserve_percent: u32,
}

fn default_gas_reserve_percent() -> u32 {
    10
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self { gas_reserve_percent: default_gas_reserve_percent() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Bounded FIFO capacity per signer (SPEC_FULL §4.2 default = 16).
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    16
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self { queue_capacity: default_queue_capacity() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_poll_interval_ms() -> u64 {
    1_000
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self { poll_interval_ms: default_poll_interval_ms(), max_attempts: default_max_attempts() }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            profile: default_profile_name(),
            nonce: NonceConfig::default(),
            sequencer: SequencerConfig::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl SdkConfig {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Lower queue capacity and tighter polling, for integration tests
    /// against a local dev chain.
    pub fn testing() -> Self {
        Self {
            profile: "testing".to_string(),
            nonce: NonceConfig { gas_reserve_percent: 20 },
            sequencer: SequencerConfig { queue_capacity: 4 },
            tracker: TrackerConfig { poll_interval_ms: 100, max_attempts: 20 },
        }
    }

    /// Wider reserve margin and more tracker patience for mainnet.
    pub fn production() -> Self {
        Self {
            profile: "production".to_string(),
            nonce: NonceConfig { gas_reserve_percent: 15 },
            sequencer: SequencerConfig { queue_capacity: 16 },
            tracker: TrackerConfig { poll_interval_ms: 2_000, max_attempts: 30 },
        }
    }

    /// Selects a profile from the `SDK_PROFILE` env var, falling back to
    /// `default`. Supported values: `testing`, `production`.
    pub fn from_env() -> Self {
        let profile = std::env::var("SDK_PROFILE").unwrap_or_else(|_| "default".to_string());
        match profile.to_lowercase().as_str() {
            "testing" | "test" => Self::testing(),
            "production" | "prod" => Self::production(),
            _ => Self::default(),
        }
    }

    pub fn log_config(&self) {
        tracing::info!(profile = %self.profile, "SDK configuration loaded");
        tracing::info!(
            gas_reserve_percent = self.nonce.gas_reserve_percent,
            queue_capacity = self.sequencer.queue_capacity,
            poll_interval_ms = self.tracker.poll_interval_ms,
            max_attempts = self.tracker.max_attempts,
            "Core tuning parameters"
        );
    }
}

static GLOBAL_CONFIG: OnceLock<SdkConfig> = OnceLock::new();

pub fn init_config(config: SdkConfig) {
    let _ = GLOBAL_CONFIG.set(config);
}

pub fn config() -> &'static SdkConfig {
    GLOBAL_CONFIG.get_or_init(SdkConfig::from_env)
}
