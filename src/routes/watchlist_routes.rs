use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::watchlist_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/watchlist",
            get(watchlist_controller::get_watchlist)
                .post(watchlist_controller::post_add_to_watchlist),
        )
        .route(
            "/api/watchlist/:symbol",
            axum::routing::delete(watchlist_controller::delete_from_watchlist),
        )
        .route(
            "/api/watchlist/:symbol/favorite",
            post(watchlist_controller::post_set_favorite),
        )
}
