use axum::{
    routing::{get, post},
    Router,
};

use crate::{controllers::alerts_controller, AppState};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/alerts",
            get(alerts_controller::get_alerts).post(alerts_controller::post_create_alert),
        )
        .route(
            "/api/alerts/:id",
            get(alerts_controller::get_alert_by_id)
                .patch(alerts_controller::patch_update_alert)
                .delete(alerts_controller::delete_alert),
        )
        .route("/api/alerts/:id/active", post(alerts_controller::post_set_active))
}
