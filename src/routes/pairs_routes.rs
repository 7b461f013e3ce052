use axum::{Router, routing::get};

use crate::{AppState, controllers::pairs_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/pairs", get(pairs_controller::get_pairs))
}
