//! Thin HTTP client for venue metadata: market listings and symbol info
//! needed to resolve a human symbol to the on-chain market address an
//! `OrderIntent` targets. Grounded on the teacher's `BlockAnaliticaClient`/
//! `LiqdClient` shape: a `reqwest::Client` plus a `base_url`, one method per
//! endpoint, `serde`-deserialized response bodies.

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInfo {
    pub market: Address,
    pub symbol: String,
    pub base_decimals: u8,
    pub quote_decimals: u8,
    pub tick_size: String,
    pub lot_size: String,
}

#[derive(Debug, Deserialize)]
struct MarketsResponse {
    markets: Vec<MarketInfo>,
}

pub struct VenueClient {
    client: reqwest::Client,
    base_url: String,
}

impl VenueClient {
    pub fn new() -> Self {
        VenueClient { client: reqwest::Client::new(), base_url: "https://api.example-clob.io".to_string() }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        VenueClient { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    #[instrument(skip(self))]
    pub async fn fetch_markets(&self) -> Result<Vec<MarketInfo>> {
        let url = format!("{}/markets", self.base_url);
        let response =
            self.client.get(&url).send().await.context("request to venue /markets failed")?;
        let body: MarketsResponse =
            response.json().await.context("failed to parse /markets response")?;
        debug!(count = body.markets.len(), "fetched venue markets");
        Ok(body.markets)
    }

    #[instrument(skip(self))]
    pub async fn resolve_symbol(&self, symbol: &str) -> Result<MarketInfo> {
        let url = format!("{}/markets/{}", self.base_url, symbol);
        let response =
            self.client.get(&url).send().await.context("request to venue /markets/{symbol} failed")?;
        let info: MarketInfo = response.json().await.context("failed to parse market info response")?;
        Ok(info)
    }
}

impl Default for VenueClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_base_url_overrides_default() {
        let client = VenueClient::with_base_url("http://localhost:9944");
        assert_eq!(client.base_url, "http://localhost:9944");
    }

    #[test]
    fn market_info_round_trips_through_json() {
        let info = MarketInfo {
            market: Address::repeat_byte(0x01),
            symbol: "ETH-USDC".to_string(),
            base_decimals: 18,
            quote_decimals: 6,
            tick_size: "0.01".to_string(),
            lot_size: "0.0001".to_string(),
        };
        let json = serde_json::to_string(&info).unwrap();
        let parsed: MarketInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.symbol, "ETH-USDC");
    }
}
