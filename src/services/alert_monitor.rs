use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::models::{Alert, Direction};
use crate::services::feed::{FeedEvent, PriceFeed};
use crate::services::registry::Registry;
use crate::services::store::AlertStore;

/// Events emitted to the front end, typed end to end. One `Alert` is sent
/// per crossed threshold per trade, carrying every user waiting on it.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Event {
    Alert {
        user_ids: Vec<String>,
        pair: String,
        direction: Direction,
        threshold: f64,
        current_price: f64,
    },
    ConnectionStatus {
        status: String,
    },
}

/// Single-writer engine state: the registry, the live subscription set, and
/// the last-known feed connection status all belong to one task; facade
/// calls only ever reach it through the rebuild queue.
pub struct AlertMonitor {
    store: Arc<dyn AlertStore>,
    feed: Arc<dyn PriceFeed>,
    events_tx: broadcast::Sender<Event>,
    rebuild_tx: mpsc::Sender<()>,
    registry: Registry,
    subscribed: BTreeSet<String>,
    connection_status: Option<String>,
}

impl AlertMonitor {
    pub fn new(
        store: Arc<dyn AlertStore>,
        feed: Arc<dyn PriceFeed>,
        events_tx: broadcast::Sender<Event>,
        rebuild_tx: mpsc::Sender<()>,
    ) -> Self {
        Self {
            store,
            feed,
            events_tx,
            rebuild_tx,
            registry: Registry::default(),
            subscribed: BTreeSet::new(),
            connection_status: None,
        }
    }

    /// Full snapshot-and-replace, then a reconciliation pass. A failed
    /// rebuild keeps the previous registry; the next scheduled rebuild
    /// effectively retries it, and no caller is waiting on this one.
    pub async fn rebuild(&mut self) {
        match Registry::build(self.store.as_ref()).await {
            Ok(registry) => {
                self.registry = registry;
                self.sync_subscriptions().await;
            }
            Err(e) => {
                tracing::error!("registry rebuild failed: {e}");
            }
        }
    }

    /// After this pass, subscribed pairs == registry pairs exactly. A second
    /// pass over an unchanged registry performs no feed calls.
    async fn sync_subscriptions(&mut self) {
        let needed = self.registry.pair_set();

        for pair in needed.difference(&self.subscribed) {
            tracing::info!("subscribing to trades for {pair}");
            self.feed.subscribe(pair).await;
        }

        for pair in self.subscribed.difference(&needed) {
            tracing::info!("unsubscribing from trades for {pair}");
            self.feed.unsubscribe(pair).await;
        }

        self.subscribed = needed;
    }

    pub async fn on_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Trade { pair, price } => self.on_trade(&pair, price).await,
            FeedEvent::ConnectionStatus(status) => self.on_connection_status(status),
        }
    }

    pub async fn on_trade(&mut self, pair: &str, price: f64) {
        let Some(crossings) = self.registry.crossed(pair, price) else {
            // Stale-subscription race: the pair left the registry after the
            // feed queued this trade.
            tracing::warn!("trade received for {pair} but pair is not in the registry");
            return;
        };

        if crossings.is_empty() {
            return;
        }

        for crossing in &crossings {
            let _ = self.events_tx.send(Event::Alert {
                user_ids: crossing.user_ids.clone(),
                pair: pair.to_string(),
                direction: crossing.direction,
                threshold: crossing.threshold.0,
                current_price: price,
            });

            let fired = Alert {
                pair: pair.to_string(),
                direction: crossing.direction,
                threshold: crossing.threshold,
            }
            .to_string();

            for user_id in &crossing.user_ids {
                if let Err(e) = self.store.remove_all(user_id, &fired).await {
                    tracing::error!("failed to delete fired alert {fired:?} for {user_id}: {e}");
                }
            }
        }

        // One rebuild per trade event, fire-and-forget. A full queue means a
        // rebuild is already pending, which covers this one too.
        let _ = self.rebuild_tx.try_send(());
    }

    fn on_connection_status(&mut self, status: String) {
        match self.connection_status.as_deref() {
            None => self.connection_status = Some(status),
            Some(prev) if prev != status => {
                self.connection_status = Some(status.clone());
                let _ = self.events_tx.send(Event::ConnectionStatus { status });
            }
            Some(_) => {}
        }
    }

    async fn shutdown(&mut self) {
        for pair in std::mem::take(&mut self.subscribed) {
            self.feed.unsubscribe(&pair).await;
        }
    }
}

/// Runs the engine until either input channel closes, then releases every
/// live subscription.
pub fn spawn_alert_monitor(
    store: Arc<dyn AlertStore>,
    feed: Arc<dyn PriceFeed>,
    events_tx: broadcast::Sender<Event>,
    rebuild_tx: mpsc::Sender<()>,
    mut rebuild_rx: mpsc::Receiver<()>,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut monitor = AlertMonitor::new(store, feed, events_tx, rebuild_tx);

        loop {
            tokio::select! {
                signal = rebuild_rx.recv() => {
                    if signal.is_none() {
                        break;
                    }
                    // Coalesce queued signals into one store scan.
                    while rebuild_rx.try_recv().is_ok() {}
                    monitor.rebuild().await;
                }

                event = feed_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    monitor.on_feed_event(event).await;
                }
            }
        }

        monitor.shutdown().await;
    })
}
