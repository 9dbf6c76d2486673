//! Contract bindings for the order book market.
//!
//! `clob` holds the CLOB interface `OrderIntent::encode_calldata` encodes
//! against; `common` holds the shared ERC20 surface.

pub mod clob;
pub mod common;

pub use clob::{encode_calldata, ICentralLimitOrderBook};
pub use common::IERC20;
