use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use mongodb::Database;

use crate::models::{Alert, AlertType, Frequency};
use crate::services::alert_engine::ActiveAlertSource;
use crate::services::finnhub::Quote;
use crate::AppState;

pub struct CreateAlertInput {
    pub symbol: String,
    pub company: String,
    pub alert_type: AlertType,
    pub threshold: f64,
    pub alert_name: Option<String>,
    pub frequency: Frequency,
}

#[derive(Debug)]
pub enum CreateAlertError {
    /// Same (symbol, direction, threshold) already exists for this user.
    Duplicate,
    Db(String),
}

pub async fn create_alert(
    state: &AppState,
    user_id: ObjectId,
    input: CreateAlertInput,
) -> Result<Alert, CreateAlertError> {
    let sym = input.symbol.to_uppercase();
    let alerts = state.db.collection::<Alert>("alerts");

    let existing = alerts
        .find_one(
            doc! {
                "user_id": user_id,
                "symbol": &sym,
                "alert_type": input.alert_type.as_str(),
                "threshold": input.threshold,
            },
            None,
        )
        .await
        .map_err(|e| CreateAlertError::Db(e.to_string()))?;

    if existing.is_some() {
        return Err(CreateAlertError::Duplicate);
    }

    let alert = Alert {
        id: ObjectId::new(),
        user_id,
        symbol: sym,
        company: input.company.trim().to_string(),
        alert_type: input.alert_type,
        threshold: input.threshold,
        alert_name: input
            .alert_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        frequency: input.frequency.code().to_string(),
        is_active: true,
        created_at: Utc::now().timestamp(),
    };

    alerts
        .insert_one(&alert, None)
        .await
        .map_err(|e| CreateAlertError::Db(e.to_string()))?;

    let _ = state.events_tx.send("alertsUpdated".to_string());

    Ok(alert)
}

#[derive(Debug, Clone, Default)]
pub struct ListAlertsParams {
    pub symbol: Option<String>,
    pub only_active: bool,
    pub search: Option<String>,
    pub page: u64,
    pub page_size: u64,
    pub sort: Option<String>,
}

pub struct AlertPage {
    pub items: Vec<Alert>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

// "field:dir" sort spec from the client, e.g. "createdAt:desc".
fn parse_sort(spec: Option<&str>) -> Document {
    let mut sort = Document::new();
    if let Some(spec) = spec {
        let mut it = spec.splitn(2, ':');
        let field = match it.next().unwrap_or("") {
            "createdAt" | "created_at" => "created_at",
            "threshold" => "threshold",
            "symbol" => "symbol",
            _ => "created_at",
        };
        let dir: i32 = if it.next() == Some("asc") { 1 } else { -1 };
        sort.insert(field, dir);
    } else {
        sort.insert("created_at", -1);
    }
    sort
}

pub async fn list_alerts(
    state: &AppState,
    user_id: ObjectId,
    params: &ListAlertsParams,
) -> Result<AlertPage, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let mut query = doc! { "user_id": user_id };
    if let Some(sym) = &params.symbol {
        query.insert("symbol", sym.to_uppercase());
    }
    if params.only_active {
        query.insert("is_active", true);
    }
    if let Some(search) = params.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let re = doc! { "$regex": search.trim(), "$options": "i" };
        query.insert(
            "$or",
            vec![
                doc! { "symbol": re.clone() },
                doc! { "company": re.clone() },
                doc! { "alert_name": re },
            ],
        );
    }

    let total = alerts
        .count_documents(query.clone(), None)
        .await
        .map_err(|e| e.to_string())?;

    let page = params.page.max(1);
    let page_size = params.page_size.clamp(1, 100);

    let find_opts = FindOptions::builder()
        .sort(parse_sort(params.sort.as_deref()))
        .skip((page - 1) * page_size)
        .limit(page_size as i64)
        .build();

    let mut cursor = alerts
        .find(query, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<Alert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(AlertPage {
        items,
        total,
        page,
        page_size,
    })
}

/// Same page, enriched with one deduplicated quote fetch per distinct symbol.
/// An unconfigured or failing provider yields an empty map and the page goes
/// out unenriched.
pub async fn list_alerts_with_quotes(
    state: &AppState,
    user_id: ObjectId,
    params: &ListAlertsParams,
) -> Result<(AlertPage, HashMap<String, Quote>), String> {
    let page = list_alerts(state, user_id, params).await?;

    let symbols: HashSet<String> = page.items.iter().map(|a| a.symbol.clone()).collect();

    let fetches = symbols.into_iter().map(|sym| async move {
        match state.finnhub.quote(&sym).await {
            Ok(q) => Some((sym, q)),
            Err(e) => {
                if !e.is_unconfigured() {
                    tracing::warn!(symbol = %sym, "quote enrichment failed: {e}");
                }
                None
            }
        }
    });

    let quotes: HashMap<String, Quote> = join_all(fetches).await.into_iter().flatten().collect();

    Ok((page, quotes))
}

pub async fn get_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Option<Alert>, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    alerts
        .find_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())
}

#[derive(Debug, Default)]
pub struct UpdateAlertFields {
    pub alert_type: Option<AlertType>,
    pub threshold: Option<f64>,
    // Some(None) clears the label
    pub alert_name: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub is_active: Option<bool>,
}

/// Partial update, last-write-wins. Returns the updated document, or None
/// when the alert does not exist or belongs to someone else.
pub async fn update_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
    fields: UpdateAlertFields,
) -> Result<Option<Alert>, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let mut set = Document::new();
    if let Some(t) = fields.alert_type {
        set.insert("alert_type", t.as_str());
    }
    if let Some(th) = fields.threshold {
        set.insert("threshold", th);
    }
    if let Some(name) = fields.alert_name {
        match name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
            Some(n) => set.insert("alert_name", n),
            None => set.insert("alert_name", mongodb::bson::Bson::Null),
        };
    }
    if let Some(freq) = fields.frequency {
        set.insert("frequency", freq.code());
    }
    if let Some(active) = fields.is_active {
        set.insert("is_active", active);
    }

    if set.is_empty() {
        return get_alert(state, user_id, alert_id).await;
    }

    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let updated = alerts
        .find_one_and_update(
            doc! { "_id": alert_id, "user_id": user_id },
            doc! { "$set": set },
            opts,
        )
        .await
        .map_err(|e| e.to_string())?;

    if updated.is_some() {
        let _ = state.events_tx.send("alertsUpdated".to_string());
    }

    Ok(updated)
}

pub async fn delete_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<bool, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let res = alerts
        .delete_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    if res.deleted_count > 0 {
        let _ = state.events_tx.send("alertsUpdated".to_string());
    }

    Ok(res.deleted_count > 0)
}

pub async fn set_alert_active(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
    active: bool,
) -> Result<Option<Alert>, String> {
    update_alert(
        state,
        user_id,
        alert_id,
        UpdateAlertFields {
            is_active: Some(active),
            ..Default::default()
        },
    )
    .await
}

/// Filter for the scheduler's cross-user scan: active alerts whose stored
/// frequency is the tier's canonical code or a recognized legacy alias.
pub fn active_filter(tier: Frequency) -> Document {
    let codes: Vec<&str> = tier.accepted_values().to_vec();
    doc! { "is_active": true, "frequency": { "$in": codes } }
}

/// Background-only bulk read used by the evaluation engine; spans all users
/// and is never exposed through the HTTP surface.
pub async fn list_active_alerts(db: &Database, tier: Frequency) -> Result<Vec<Alert>, String> {
    let alerts = db.collection::<Alert>("alerts");

    let mut cursor = alerts
        .find(active_filter(tier), None)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<Alert> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

/// Mongo-backed alert source handed to the evaluation engine.
pub struct MongoAlerts {
    db: Database,
}

impl MongoAlerts {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ActiveAlertSource for MongoAlerts {
    async fn list_active(&self, tier: Frequency) -> Result<Vec<Alert>, String> {
        list_active_alerts(&self.db, tier).await
    }
}
