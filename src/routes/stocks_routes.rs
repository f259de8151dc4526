use axum::{routing::get, Router};

use crate::{controllers::stocks_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/api/stocks/search", get(stocks_controller::get_search))
}
