//! Transaction submission and lifecycle core for an automated CLOB trader.
//!
//! Four tightly coupled subsystems, built against abstract capability
//! traits so concrete Alloy-backed implementations live downstream in
//! `clob-chain`:
//! - [`nonce`]: per-address exclusive nonce issuance.
//! - [`sequencer`]: bounded ordered per-signer submission queue.
//! - [`tracker`]: background receipt polling.
//! - [`executor`]: orchestrates nonce -> gas -> sign -> send, direct or queued.

pub mod capability;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod intent;
pub mod nonce;
pub mod registry;
pub mod sequencer;
pub mod tracker;
pub mod tx;

pub use capability::{BlockTag, Clock, RpcCap, SignerCap};
pub use config::{config, init_config, SdkConfig};
pub use error::{CoreError, CoreResult};
pub use events::{CoreEvent, EventError, Receipt};
pub use executor::{DirectExecutor, QueuedExecutor};
pub use intent::{OrderIntent, OrderSide};
pub use nonce::{NonceLease, NonceManager};
pub use registry::{PendingRequest, PendingRequestRegistry};
pub use sequencer::{CallSequencer, CallSequencerRegistry, SequencerKey, SlotState, SubmitOutcome};
pub use tracker::TxTracker;
pub use tx::{GasFields, SignedTx, TxRequest, TxRequestParams};
