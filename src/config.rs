use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub feed_rest_url: String,
    pub feed_ws_url: String,
    pub price_timeout_ms: u64,

    // Empty list = any caller id accepted (local development).
    pub authorized_user_ids: Vec<String>,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "pairwatch".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let feed_rest_url = env::var("FEED_REST_URL")
        .unwrap_or_else(|_| "https://api.binance.com/api/v3".to_string());

    let feed_ws_url = env::var("FEED_WS_URL")
        .unwrap_or_else(|_| "wss://stream.binance.com:9443/ws".to_string());

    let price_timeout_ms = env::var("PRICE_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(5_000);

    let authorized_user_ids = env::var("AUTHORIZED_USER_IDS")
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        feed_rest_url,
        feed_ws_url,
        price_timeout_ms,
        authorized_user_ids,
    }
}
