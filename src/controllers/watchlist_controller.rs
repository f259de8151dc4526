use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::{CurrentUser, WatchlistItem},
    services::watchlist_service,
    AppState,
};

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": "unauthorized" })),
    )
        .into_response()
}

fn db_error(e: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": format!("db error: {e}") })),
    )
        .into_response()
}

fn item_json(item: &WatchlistItem) -> serde_json::Value {
    json!({
        "id": item.id.to_hex(),
        "symbol": item.symbol,
        "company": item.company,
        "isFavorite": item.is_favorite,
        "addedAt": item.added_at,
    })
}

// GET /api/watchlist
pub async fn get_watchlist(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match watchlist_service::list_watchlist(&state, u.id).await {
        Ok(items) => {
            let items: Vec<serde_json::Value> = items.iter().map(item_json).collect();
            (StatusCode::OK, Json(json!({ "items": items }))).into_response()
        }
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct AddWatchlistBody {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub company: String,
}

// POST /api/watchlist
pub async fn post_add_to_watchlist(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<AddWatchlistBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    if body.symbol.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "errors": { "symbol": "Symbol is required." } })),
        )
            .into_response();
    }

    match watchlist_service::add_to_watchlist(&state, u.id, body.symbol.trim(), &body.company).await
    {
        Ok(item) => (StatusCode::CREATED, Json(item_json(&item))).into_response(),
        Err(e) => db_error(e),
    }
}

// DELETE /api/watchlist/:symbol
pub async fn delete_from_watchlist(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match watchlist_service::remove_from_watchlist(&state, u.id, &symbol).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "symbol not on watchlist" })),
        )
            .into_response(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct FavoriteBody {
    pub favorite: bool,
}

// POST /api/watchlist/:symbol/favorite
pub async fn post_set_favorite(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<FavoriteBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    match watchlist_service::set_favorite(&state, u.id, &symbol, body.favorite).await {
        Ok(Some(item)) => (StatusCode::OK, Json(item_json(&item))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "symbol not on watchlist" })),
        )
            .into_response(),
        Err(e) => db_error(e),
    }
}
