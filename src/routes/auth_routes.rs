use axum::{routing::post, Router};

use crate::{controllers::auth_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route("/auth/register", post(auth_controller::post_register))
        .route("/auth/login", post(auth_controller::post_login))
        .route("/auth/logout", post(auth_controller::post_logout))
}
