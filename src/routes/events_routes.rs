use axum::{Router, routing::get};

use crate::{AppState, controllers::events_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/events", get(events_controller::sse_events))
}
