use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use serde_json::json;

use crate::{
    models::{Alert, AlertType, CurrentUser, Frequency},
    services::alerts_service::{
        self, CreateAlertError, CreateAlertInput, ListAlertsParams, UpdateAlertFields,
    },
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

fn bad_id() -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": "bad id" }))).into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "alert not found" })),
    )
        .into_response()
}

fn alert_json(a: &Alert) -> serde_json::Value {
    json!({
        "id": a.id.to_hex(),
        "symbol": a.symbol,
        "company": a.company,
        "alertType": a.alert_type.as_str(),
        "threshold": a.threshold,
        "alertName": a.alert_name,
        "frequency": a.frequency,
        "isActive": a.is_active,
        "createdAt": a.created_at,
    })
}

// ---------------- List ----------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub symbol: Option<String>,
    #[serde(default)]
    pub only_active: bool,
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    pub sort: Option<String>,
    #[serde(default)]
    pub with_quotes: bool,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

// GET /api/alerts
pub async fn get_alerts(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Query(q): Query<ListQuery>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let params = ListAlertsParams {
        symbol: q.symbol,
        only_active: q.only_active,
        search: q.search,
        page: q.page,
        page_size: q.page_size,
        sort: q.sort,
    };

    if q.with_quotes {
        let (page, quotes) = match alerts_service::list_alerts_with_quotes(&state, u.id, &params).await
        {
            Ok(v) => v,
            Err(e) => return db_error(e),
        };

        let items: Vec<serde_json::Value> = page
            .items
            .iter()
            .map(|a| {
                let mut v = alert_json(a);
                if let Some(quote) = quotes.get(&a.symbol) {
                    v["currentPrice"] = json!(quote.price);
                    v["changePercent"] = json!(quote.change_percent);
                }
                v
            })
            .collect();

        return (
            StatusCode::OK,
            Json(json!({
                "items": items,
                "total": page.total,
                "page": page.page,
                "pageSize": page.page_size,
            })),
        )
            .into_response();
    }

    let page = match alerts_service::list_alerts(&state, u.id, &params).await {
        Ok(p) => p,
        Err(e) => return db_error(e),
    };

    let items: Vec<serde_json::Value> = page.items.iter().map(alert_json).collect();

    (
        StatusCode::OK,
        Json(json!({
            "items": items,
            "total": page.total,
            "page": page.page,
            "pageSize": page.page_size,
        })),
    )
        .into_response()
}

// ---------------- Create ----------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertBody {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub company: String,
    pub alert_type: AlertType,
    pub threshold: f64,
    pub alert_name: Option<String>,
    pub frequency: Option<String>,
}

// POST /api/alerts
pub async fn post_create_alert(
    State(state): State<AppState>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<CreateAlertBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let mut errs = serde_json::Map::new();

    if body.symbol.trim().is_empty() {
        errs.insert("symbol".into(), json!("Symbol is required."));
    }
    if body.company.trim().is_empty() {
        errs.insert("company".into(), json!("Company is required."));
    }
    if !body.threshold.is_finite() {
        errs.insert("threshold".into(), json!("Threshold must be a finite number."));
    }

    let frequency = match body.frequency.as_deref() {
        None => Frequency::Day,
        Some(raw) => match Frequency::parse(raw) {
            Some(f) => f,
            None => {
                errs.insert("frequency".into(), json!("Unrecognized frequency."));
                Frequency::Day
            }
        },
    };

    if !errs.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errs }))).into_response();
    }

    let input = CreateAlertInput {
        symbol: body.symbol.trim().to_string(),
        company: body.company,
        alert_type: body.alert_type,
        threshold: body.threshold,
        alert_name: body.alert_name,
        frequency,
    };

    match alerts_service::create_alert(&state, u.id, input).await {
        Ok(alert) => (StatusCode::CREATED, Json(alert_json(&alert))).into_response(),
        Err(CreateAlertError::Duplicate) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "An identical alert already exists." })),
        )
            .into_response(),
        Err(CreateAlertError::Db(e)) => db_error(e),
    }
}

// ---------------- Read / Update / Delete ----------------

// GET /api/alerts/:id
pub async fn get_alert_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::get_alert(&state, u.id, oid).await {
        Ok(Some(alert)) => (StatusCode::OK, Json(alert_json(&alert))).into_response(),
        Ok(None) => not_found(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAlertBody {
    pub alert_type: Option<AlertType>,
    pub threshold: Option<f64>,
    // empty string clears the label
    pub alert_name: Option<String>,
    pub frequency: Option<String>,
    pub is_active: Option<bool>,
}

// PATCH /api/alerts/:id
pub async fn patch_update_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<UpdateAlertBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    let mut errs = serde_json::Map::new();

    if let Some(th) = body.threshold {
        if !th.is_finite() {
            errs.insert("threshold".into(), json!("Threshold must be a finite number."));
        }
    }

    let frequency = match body.frequency.as_deref() {
        None => None,
        Some(raw) => match Frequency::parse(raw) {
            Some(f) => Some(f),
            None => {
                errs.insert("frequency".into(), json!("Unrecognized frequency."));
                None
            }
        },
    };

    if !errs.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errs }))).into_response();
    }

    let fields = UpdateAlertFields {
        alert_type: body.alert_type,
        threshold: body.threshold,
        alert_name: body.alert_name.map(Some),
        frequency,
        is_active: body.is_active,
    };

    match alerts_service::update_alert(&state, u.id, oid, fields).await {
        Ok(Some(alert)) => (StatusCode::OK, Json(alert_json(&alert))).into_response(),
        Ok(None) => not_found(),
        Err(e) => db_error(e),
    }
}

// DELETE /api/alerts/:id
pub async fn delete_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::delete_alert(&state, u.id, oid).await {
        Ok(true) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Ok(false) => not_found(),
        Err(e) => db_error(e),
    }
}

#[derive(Deserialize)]
pub struct SetActiveBody {
    pub active: bool,
}

// POST /api/alerts/:id/active
pub async fn post_set_active(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: Option<Extension<CurrentUser>>,
    Json(body): Json<SetActiveBody>,
) -> Response {
    let Some(Extension(u)) = user else {
        return unauthorized();
    };

    let Ok(oid) = ObjectId::parse_str(&id) else {
        return bad_id();
    };

    match alerts_service::set_alert_active(&state, u.id, oid, body.active).await {
        Ok(Some(alert)) => (StatusCode::OK, Json(alert_json(&alert))).into_response(),
        Ok(None) => not_found(),
        Err(e) => db_error(e),
    }
}
