//! Off-chain venue clients for an automated CLOB trader.
//!
//! This crate provides:
//! - `market_data`: WebSocket market-data feed (top-of-book/trade events)
//! - `venue`: HTTP client for market listings/symbol resolution
//!
//! Depends on `clob-core` only for shared vocabulary types (`Address`,
//! `OrderSide`); it has no knowledge of the submission pipeline.

pub mod market_data;
pub mod venue;

pub use market_data::{run_with_reconnect, MarketDataClient, MarketDataEvent};
pub use venue::{MarketInfo, VenueClient};
