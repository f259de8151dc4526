use axum::{routing::get, Router};

use crate::{controllers::events_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/events", get(events_controller::sse_events))
}
