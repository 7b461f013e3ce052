use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::get;

use crate::{AppState, controllers::home_controller};

pub mod alerts_routes;
pub mod events_routes;
pub mod pairs_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = alerts_routes::add_routes(router);
    let router = pairs_routes::add_routes(router);
    let router = events_routes::add_routes(router);

    router
        .route("/", get(home_controller::index))
        .route("/health", get(home_controller::health))
        .fallback(home_controller::not_found)
        .layer(from_fn_with_state(state.clone(), crate::auth::require_user))
        .with_state(state)
}
