use axum::{Router, routing::{delete, post}};

use crate::{AppState, controllers::alerts_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/alerts",
            post(alerts_controller::post_create_alert).get(alerts_controller::get_alerts),
        )
        .route("/alerts/:index", delete(alerts_controller::delete_alert))
}
