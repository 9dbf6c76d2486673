//! Configuration system for the submission core.
//!
//! RPC/gas configuration lives in `clob_chain::config` instead, since it's
//! specific to the concrete chain collaborators, not the abstract core.

mod sdk;

pub use sdk::{config, init_config, NonceConfig, SdkConfig, SequencerConfig, TrackerConfig};
