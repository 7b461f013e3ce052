use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::AppState;

#[derive(Deserialize)]
pub struct PairsQuery {
    pub q: Option<String>,
}

// GET /pairs?q=eur
pub async fn get_pairs(
    State(state): State<AppState>,
    Query(query): Query<PairsQuery>,
) -> impl IntoResponse {
    let pairs = state.alerts.pairs().list(query.q.as_deref());

    Json(pairs)
}
