use axum::middleware::from_fn_with_state;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::{controllers::home_controller, AppState};

pub mod home_routes;
pub mod auth_routes;
pub mod alerts_routes;
pub mod watchlist_routes;
pub mod stocks_routes;
pub mod events_routes;

pub fn app(state: AppState) -> Router {
    let router = Router::<AppState>::new();

    let router = home_routes::add_routes(router);
    let router = auth_routes::add_routes(router);
    let router = alerts_routes::add_routes(router);
    let router = watchlist_routes::add_routes(router);
    let router = stocks_routes::add_routes(router);
    let router = events_routes::add_routes(router);

    router
        .fallback(home_controller::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), crate::auth::require_auth))
        .layer(from_fn_with_state(state.clone(), crate::auth::inject_current_user))
        .with_state(state)
}
