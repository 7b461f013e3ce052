use std::net::SocketAddr;
use std::sync::Arc;

use mongodb::Client;
use tokio::sync::{broadcast, mpsc};

use pairwatch::models::PairTable;
use pairwatch::services::alert_monitor::spawn_alert_monitor;
use pairwatch::services::alerts_service::AlertService;
use pairwatch::services::feed::{MarketFeedClient, PriceFeed};
use pairwatch::services::store::{AlertStore, MongoAlertStore};
use pairwatch::{AppState, config, routes};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    let store: Arc<dyn AlertStore> = Arc::new(MongoAlertStore::new(db));
    let pairs = Arc::new(PairTable::load());

    let (feed_tx, feed_rx) = mpsc::channel(256);
    let feed: Arc<dyn PriceFeed> =
        Arc::new(MarketFeedClient::spawn(&settings, pairs.clone(), feed_tx));

    let (events_tx, _) = broadcast::channel(64);
    let (rebuild_tx, rebuild_rx) = mpsc::channel(16);

    let _monitor = spawn_alert_monitor(
        store.clone(),
        feed.clone(),
        events_tx.clone(),
        rebuild_tx.clone(),
        rebuild_rx,
        feed_rx,
    );

    // Build the registry from persisted alerts before serving traffic.
    let _ = rebuild_tx.send(()).await;

    let alerts = AlertService::new(store, feed, pairs, rebuild_tx);

    let state = AppState {
        settings: settings.clone(),
        alerts,
        events_tx,
    };

    let app = routes::app(state);

    let addr = SocketAddr::from((
        settings.host.parse::<std::net::IpAddr>().unwrap(),
        settings.port,
    ));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
