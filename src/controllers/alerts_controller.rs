use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{AppState, error::AlertError, models::CurrentUser};

#[derive(Deserialize)]
pub struct CreateAlertForm {
    pub pair: String,
    pub price: f64,
}

#[derive(Serialize)]
struct AlertRow {
    index: usize,
    alert: String,
}

// POST /alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(form): Json<CreateAlertForm>,
) -> Result<impl IntoResponse, AlertError> {
    let alert = state.alerts.set_alert(&user.id, &form.pair, form.price).await?;

    Ok((StatusCode::CREATED, Json(json!({ "alert": alert }))))
}

// GET /alerts
pub async fn get_alerts(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AlertError> {
    let rows: Vec<AlertRow> = state
        .alerts
        .list_alerts(&user.id)
        .await?
        .into_iter()
        .enumerate()
        .map(|(index, alert)| AlertRow { index, alert })
        .collect();

    Ok(Json(rows))
}

// DELETE /alerts/:index
pub async fn delete_alert(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(index): Path<usize>,
) -> Result<impl IntoResponse, AlertError> {
    state.alerts.delete_alert_at(&user.id, index).await?;

    Ok(StatusCode::NO_CONTENT)
}
