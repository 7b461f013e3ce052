use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use tokio::sync::mpsc;
use tower::ServiceExt;

use pairwatch::error::AlertError;
use pairwatch::models::{Direction, PairTable};
use pairwatch::services::alert_monitor::Event;
use pairwatch::services::alerts_service::AlertService;
use pairwatch::services::feed::PriceFeed;
use pairwatch::services::store::{AlertStore, MemoryStore};
use pairwatch::{AppState, config, routes};

/// Feed double serving one fixed spot price for every pair.
struct StaticFeed(f64);

#[async_trait]
impl PriceFeed for StaticFeed {
    async fn current_price(&self, _pair: &str) -> Result<f64, AlertError> {
        Ok(self.0)
    }

    async fn subscribe(&self, _pair: &str) {}

    async fn unsubscribe(&self, _pair: &str) {}
}

fn test_state(current_price: f64, authorized: &[&str]) -> (AppState, MemoryStore) {
    let mut settings = config::load();
    settings.authorized_user_ids = authorized.iter().map(|s| s.to_string()).collect();

    let store = MemoryStore::new();
    let (rebuild_tx, _rebuild_rx) = mpsc::channel(16);
    let (events_tx, _events_rx) = tokio::sync::broadcast::channel(16);

    let alerts = AlertService::new(
        Arc::new(store.clone()),
        Arc::new(StaticFeed(current_price)),
        Arc::new(PairTable::load()),
        rebuild_tx,
    );

    (
        AppState {
            settings,
            alerts,
            events_tx,
        },
        store,
    )
}

async fn next_sse_chunk(body: &mut axum::body::Body) -> String {
    let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
        .await
        .expect("timed out waiting for SSE chunk")
        .expect("SSE stream ended")
        .expect("SSE body error");
    let data = frame.into_data().expect("expected a data frame");
    String::from_utf8(data.to_vec()).unwrap()
}

async fn response_json(res: axum::response::Response) -> serde_json::Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_alert(user: &str, body: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri("/alerts")
        .header("x-user-id", user)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

fn get(user: &str, uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("x-user-id", user)
        .body(axum::body::Body::empty())
        .unwrap()
}

#[tokio::test]
async fn create_alert_returns_canonical_string_and_lists_it() {
    let (state, _store) = test_state(65000.0, &[]);

    let app = routes::app(state.clone());
    let res = app
        .oneshot(post_alert("u1", r#"{"pair":"BTCUSD","price":70000}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = response_json(res).await;
    assert_eq!(body["alert"], "BTCUSD above 70000");

    let app = routes::app(state);
    let res = app.oneshot(get("u1", "/alerts")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = response_json(res).await;
    assert_eq!(body[0]["index"], 0);
    assert_eq!(body[0]["alert"], "BTCUSD above 70000");
}

#[tokio::test]
async fn create_alert_at_current_price_is_rejected() {
    let (state, _store) = test_state(65000.0, &[]);

    let res = routes::app(state)
        .oneshot(post_alert("u1", r#"{"pair":"BTCUSD","price":65000}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = response_json(res).await;
    assert_eq!(body["error"], "target price is equal to current price");
}

#[tokio::test]
async fn duplicate_alert_conflicts() {
    let (state, _store) = test_state(65000.0, &[]);

    let res = routes::app(state.clone())
        .oneshot(post_alert("u1", r#"{"pair":"BTCUSD","price":70000}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = routes::app(state)
        .oneshot(post_alert("u1", r#"{"pair":"BTCUSD","price":70000}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_pair_is_rejected() {
    let (state, _store) = test_state(65000.0, &[]);

    let res = routes::app(state)
        .oneshot(post_alert("u1", r#"{"pair":"NOPEUSD","price":1}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = response_json(res).await;
    assert_eq!(body["error"], "pair is not supported");
}

#[tokio::test]
async fn delete_alert_by_index() {
    let (state, store) = test_state(65000.0, &[]);

    routes::app(state.clone())
        .oneshot(post_alert("u1", r#"{"pair":"BTCUSD","price":70000}"#))
        .await
        .unwrap();

    let res = routes::app(state.clone())
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/alerts/0")
                .header("x-user-id", "u1")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(store.list("u1").await.unwrap().is_empty());

    // Nothing left at index 0.
    let res = routes::app(state)
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/alerts/0")
                .header("x-user-id", "u1")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn alerts_require_an_authorized_caller() {
    let (state, _store) = test_state(65000.0, &["alice"]);

    let res = routes::app(state.clone())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/alerts")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = routes::app(state.clone())
        .oneshot(get("mallory", "/alerts"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = routes::app(state).oneshot(get("alice", "/alerts")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn sse_alerts_reach_only_their_users() {
    let (state, _store) = test_state(65000.0, &[]);

    let alice = routes::app(state.clone())
        .oneshot(get("alice", "/events"))
        .await
        .unwrap();
    assert_eq!(alice.status(), StatusCode::OK);
    let bob = routes::app(state.clone())
        .oneshot(get("bob", "/events"))
        .await
        .unwrap();
    assert_eq!(bob.status(), StatusCode::OK);

    // Both streams are subscribed; now emit one alert for alice and one
    // status change for everyone.
    state
        .events_tx
        .send(Event::Alert {
            user_ids: vec!["alice".to_string()],
            pair: "BTCUSD".to_string(),
            direction: Direction::Above,
            threshold: 70000.0,
            current_price: 70001.0,
        })
        .unwrap();
    state
        .events_tx
        .send(Event::ConnectionStatus {
            status: "disconnected".to_string(),
        })
        .unwrap();

    let mut alice_body = alice.into_body();
    let chunk = next_sse_chunk(&mut alice_body).await;
    assert!(chunk.contains("event: alert"), "got {chunk:?}");
    assert!(chunk.contains(r#""user_ids":["alice"]"#), "got {chunk:?}");
    let chunk = next_sse_chunk(&mut alice_body).await;
    assert!(chunk.contains("event: connection-status"), "got {chunk:?}");

    // Bob never sees alice's alert; his first chunk is the status change.
    let mut bob_body = bob.into_body();
    let chunk = next_sse_chunk(&mut bob_body).await;
    assert!(chunk.contains("event: connection-status"), "got {chunk:?}");
    assert!(!chunk.contains("alert"), "got {chunk:?}");
}

#[tokio::test]
async fn pairs_and_health_are_public() {
    let (state, _store) = test_state(65000.0, &["alice"]);

    let res = routes::app(state.clone())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/pairs?q=eur")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = response_json(res).await;
    assert!(body.as_array().unwrap().iter().all(|p| p.as_str().unwrap().contains("EUR")));

    let res = routes::app(state.clone())
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/health")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = routes::app(state)
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/")
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = response_json(res).await;
    assert_eq!(body["service"], "pairwatch");
}
