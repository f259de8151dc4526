use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{services::finnhub::FinnhubError, AppState};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// GET /api/stocks/search
pub async fn get_search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let q = query.q.trim().to_string();

    if q.is_empty() {
        return (
            StatusCode::OK,
            Json(json!({ "query": "", "results": [] })),
        )
            .into_response();
    }

    match state.finnhub.search(&q).await {
        Ok(resp) => {
            let results: Vec<serde_json::Value> = resp
                .result
                .into_iter()
                .filter(|it| !it.symbol.trim().is_empty())
                .take(10)
                .map(|it| {
                    json!({
                        "symbol": it.symbol,
                        "displaySymbol": it.display_symbol,
                        "description": it.description,
                        "type": it.kind,
                    })
                })
                .collect();

            (StatusCode::OK, Json(json!({ "query": q, "results": results }))).into_response()
        }
        Err(FinnhubError::Unconfigured) => {
            (StatusCode::OK, Json(json!({ "query": q, "results": [] }))).into_response()
        }
        Err(e) => {
            tracing::warn!("symbol search failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "search unavailable right now" })),
            )
                .into_response()
        }
    }
}
