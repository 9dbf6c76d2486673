//! WebSocket market-data client for order book top-of-book/trade feeds.
//!
//! Independent of the submission core: this is a read-only venue feed, not
//! part of the nonce/sequencer/executor/tracker pipeline. Grounded on the
//! teacher's `EventListener`, which keeps a WebSocket subscription alive by
//! folding the underlying provider into a `futures::stream::unfold` state
//! tuple; here the provider is a `tokio-tungstenite` connection instead of
//! an `alloy::providers::WsConnect` subscription.

use std::pin::Pin;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::Message;
use clob_core::intent::OrderSide;
use tracing::{debug, info, warn};

/// A single top-of-book or trade update pushed by the venue feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketDataEvent {
    BookUpdate { market: Address, side: OrderSide, price: U256, quantity: U256 },
    Trade { market: Address, price: U256, quantity: U256, taker_side: OrderSide },
}

/// WebSocket client for a market-data venue feed.
pub struct MarketDataClient {
    ws_url: String,
}

impl MarketDataClient {
    pub fn new(ws_url: impl Into<String>) -> Self {
        MarketDataClient { ws_url: ws_url.into() }
    }

    /// Opens the WebSocket connection and subscribes to `markets`, returning
    /// a stream of [`MarketDataEvent`]. The connection is kept alive inside
    /// the stream's `unfold` state the same way the teacher keeps its
    /// provider subscription alive — dropping the returned stream closes
    /// the socket.
    pub async fn subscribe(
        &self,
        markets: Vec<Address>,
    ) -> Result<Pin<Box<dyn Stream<Item = MarketDataEvent> + Send>>> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(&self.ws_url)
            .await
            .context("failed to connect to market-data websocket")?;

        let (mut write, read) = ws_stream.split();

        let subscribe_msg = serde_json::json!({
            "op": "subscribe",
            "markets": markets.iter().map(|m| format!("{m:#x}")).collect::<Vec<_>>(),
        });
        {
            use futures::SinkExt;
            write
                .send(Message::Text(subscribe_msg.to_string()))
                .await
                .context("failed to send subscribe message")?;
        }
        info!(markets = markets.len(), "subscribed to market-data feed");

        // `write` and the subscribe acknowledgement are folded into the
        // stream's state purely to keep the socket from being dropped;
        // nothing downstream reads from `write` again.
        let event_stream = futures::stream::unfold((read, write), |(mut read, write)| async move {
            loop {
                match read.next().await {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<MarketDataEvent>(&text) {
                        Ok(event) => return Some((event, (read, write))),
                        Err(error) => {
                            debug!(%error, "skipping unparseable market-data message");
                            continue;
                        }
                    },
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => {
                        warn!(%error, "market-data websocket error");
                        return None;
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(event_stream))
    }
}

/// Reconnect loop: resubscribes with exponential backoff whenever the
/// underlying stream ends, forwarding events onto `tx` until the caller
/// drops the receiver.
pub async fn run_with_reconnect(
    client: &MarketDataClient,
    markets: Vec<Address>,
    tx: tokio::sync::mpsc::Sender<MarketDataEvent>,
) {
    let mut backoff = Duration::from_millis(500);
    const MAX_BACKOFF: Duration = Duration::from_secs(30);

    loop {
        match client.subscribe(markets.clone()).await {
            Ok(mut stream) => {
                backoff = Duration::from_millis(500);
                while let Some(event) = stream.next().await {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
                warn!("market-data stream ended, reconnecting");
            }
            Err(error) => {
                warn!(%error, backoff_ms = backoff.as_millis() as u64, "market-data subscribe failed");
            }
        }
        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}
