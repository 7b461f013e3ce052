use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::{AppState, models::CurrentUser};

fn is_public_path(path: &str) -> bool {
    path == "/" || path == "/health" || path == "/pairs"
}

/// Identifies the caller from the `x-user-id` header and stores it in
/// request extensions. With a configured allow-list, ids off the list are
/// rejected; an empty list accepts any non-empty id (local development).
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if is_public_path(req.uri().path()) {
        return next.run(req).await;
    }

    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let Some(user_id) = user_id else {
        return (StatusCode::UNAUTHORIZED, "missing x-user-id header").into_response();
    };

    let allowed = &state.settings.authorized_user_ids;
    if !allowed.is_empty() && !allowed.iter().any(|id| *id == user_id) {
        return (StatusCode::UNAUTHORIZED, "user is not authorized").into_response();
    }

    req.extensions_mut().insert(CurrentUser {
        id: user_id.to_string(),
    });

    next.run(req).await
}
