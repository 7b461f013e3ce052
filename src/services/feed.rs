use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as TMessage};

use crate::config::Settings;
use crate::error::AlertError;
use crate::models::PairTable;

/// Events pushed by the feed into the alert monitor's channel.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Trade { pair: String, price: f64 },
    ConnectionStatus(String),
}

/// Price feed boundary: bounded-wait current-price fetch plus per-pair trade
/// subscriptions. Trade events and connection-state changes arrive on the
/// channel handed to the live client at construction.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn current_price(&self, pair: &str) -> Result<f64, AlertError>;

    async fn subscribe(&self, pair: &str);

    async fn unsubscribe(&self, pair: &str);
}

enum FeedCommand {
    Subscribe(String),
    Unsubscribe(String),
}

/// Live market-data client: REST for spot prices, one WebSocket connection
/// carrying every trade stream, reconnecting with resubscribe on drop.
#[derive(Clone)]
pub struct MarketFeedClient {
    http: reqwest::Client,
    rest_url: String,
    pairs: Arc<PairTable>,
    cmd_tx: mpsc::UnboundedSender<FeedCommand>,
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    price: String,
}

#[derive(Debug, Deserialize)]
struct TradeMessage {
    e: String,
    s: String,
    p: String,
}

impl MarketFeedClient {
    /// Builds the client and spawns its socket task. `events_tx` is the
    /// alert monitor's feed channel.
    pub fn spawn(
        settings: &Settings,
        pairs: Arc<PairTable>,
        events_tx: mpsc::Sender<FeedEvent>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.price_timeout_ms))
            .build()
            .unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_socket_task(
            settings.feed_ws_url.clone(),
            pairs.clone(),
            cmd_rx,
            events_tx,
        ));

        Self {
            http,
            rest_url: settings.feed_rest_url.clone(),
            pairs,
            cmd_tx,
        }
    }
}

#[async_trait]
impl PriceFeed for MarketFeedClient {
    async fn current_price(&self, pair: &str) -> Result<f64, AlertError> {
        let symbol = self
            .pairs
            .stream_symbol(pair)
            .ok_or(AlertError::PriceUnavailable)?;

        let url = format!("{}/ticker/price", self.rest_url);
        let res = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("price fetch failed for {pair}: {e}");
                AlertError::PriceUnavailable
            })?;

        if !res.status().is_success() {
            tracing::warn!("price fetch for {pair} returned {}", res.status());
            return Err(AlertError::PriceUnavailable);
        }

        let ticker = res
            .json::<TickerPrice>()
            .await
            .map_err(|_| AlertError::PriceUnavailable)?;

        let price: f64 = ticker
            .price
            .parse()
            .map_err(|_| AlertError::PriceUnavailable)?;

        if !price.is_finite() {
            return Err(AlertError::PriceUnavailable);
        }

        Ok(price)
    }

    async fn subscribe(&self, pair: &str) {
        let _ = self.cmd_tx.send(FeedCommand::Subscribe(pair.to_string()));
    }

    async fn unsubscribe(&self, pair: &str) {
        let _ = self.cmd_tx.send(FeedCommand::Unsubscribe(pair.to_string()));
    }
}

fn stream_name(symbol: &str) -> String {
    format!("{}@trade", symbol.to_lowercase())
}

async fn run_socket_task(
    ws_url: String,
    pairs: Arc<PairTable>,
    mut cmd_rx: mpsc::UnboundedReceiver<FeedCommand>,
    events_tx: mpsc::Sender<FeedEvent>,
) {
    // Pairs that should currently have a live stream; replayed on reconnect.
    let mut wanted: BTreeSet<String> = BTreeSet::new();
    let mut msg_id: u64 = 0;

    loop {
        tracing::info!("connecting to feed WS at {ws_url}");

        let (ws, _) = match connect_async(ws_url.as_str()).await {
            Ok(x) => x,
            Err(err) => {
                tracing::error!("feed WS connect failed: {err}");
                if events_tx
                    .send(FeedEvent::ConnectionStatus("disconnected".to_string()))
                    .await
                    .is_err()
                {
                    return;
                }
                tokio::time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        tracing::info!("feed WS connected");
        if events_tx
            .send(FeedEvent::ConnectionStatus("connected".to_string()))
            .await
            .is_err()
        {
            return;
        }

        let (mut write, mut read) = ws.split();

        // Re-establish the streams we were carrying before the drop.
        for pair in &wanted {
            if let Some(symbol) = pairs.stream_symbol(pair) {
                msg_id += 1;
                let sub = serde_json::json!({
                    "method": "SUBSCRIBE",
                    "params": [stream_name(symbol)],
                    "id": msg_id,
                });
                let _ = write.send(TMessage::Text(sub.to_string())).await;
            }
        }

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else {
                        // Client dropped: process shutdown.
                        let _ = write.send(TMessage::Close(None)).await;
                        return;
                    };

                    let (method, pair) = match cmd {
                        FeedCommand::Subscribe(p) => {
                            wanted.insert(p.clone());
                            ("SUBSCRIBE", p)
                        }
                        FeedCommand::Unsubscribe(p) => {
                            wanted.remove(&p);
                            ("UNSUBSCRIBE", p)
                        }
                    };

                    if let Some(symbol) = pairs.stream_symbol(&pair) {
                        msg_id += 1;
                        let msg = serde_json::json!({
                            "method": method,
                            "params": [stream_name(symbol)],
                            "id": msg_id,
                        });
                        if write.send(TMessage::Text(msg.to_string())).await.is_err() {
                            break;
                        }
                    }
                }

                ws_msg = read.next() => {
                    match ws_msg {
                        Some(Ok(TMessage::Text(txt))) => {
                            // Non-trade frames (subscribe acks) fail to parse
                            // and are ignored.
                            let Ok(trade) = serde_json::from_str::<TradeMessage>(&txt) else {
                                continue;
                            };
                            if trade.e != "trade" {
                                continue;
                            }

                            let Some(pair) = pairs.pair_for_stream(&trade.s) else {
                                tracing::warn!("trade for unknown stream symbol {}", trade.s);
                                continue;
                            };

                            let Ok(price) = trade.p.parse::<f64>() else {
                                tracing::warn!("unparseable trade price {:?} for {pair}", trade.p);
                                continue;
                            };

                            if events_tx
                                .send(FeedEvent::Trade { pair: pair.to_string(), price })
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                        Some(Ok(TMessage::Ping(payload))) => {
                            let _ = write.send(TMessage::Pong(payload)).await;
                        }
                        Some(Ok(TMessage::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::error!("feed WS error: {err}");
                            break;
                        }
                    }
                }
            }
        }

        if events_tx
            .send(FeedEvent::ConnectionStatus("disconnected".to_string()))
            .await
            .is_err()
        {
            return;
        }

        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}
