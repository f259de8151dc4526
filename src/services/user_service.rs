use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::FindOptions;
use mongodb::Database;
use serde::Deserialize;

use crate::services::alert_engine::UserDirectory;

/// Contact info the notification path needs for one alert owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub email: String,
    pub name: String,
}

// Lean projection of a user document; the directory never touches
// credentials.
#[derive(Debug, Deserialize)]
struct DirectoryUser {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default)]
    email: String,
    #[serde(default)]
    username: Option<String>,
}

/// Resolve a batch of owner ids to contact info in one query. Ids without a
/// matching user are simply absent from the map.
pub async fn resolve_recipients(
    db: &Database,
    ids: &[ObjectId],
) -> Result<HashMap<ObjectId, Recipient>, String> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users = db.collection::<DirectoryUser>("users");

    let find_opts = FindOptions::builder()
        .projection(doc! { "_id": 1, "email": 1, "username": 1 })
        .build();

    let mut cursor = users
        .find(doc! { "_id": { "$in": ids.to_vec() } }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut map = HashMap::new();
    while let Some(res) = cursor.next().await {
        let u = res.map_err(|e| e.to_string())?;
        if u.email.is_empty() {
            continue;
        }
        map.insert(
            u.id,
            Recipient {
                email: u.email,
                name: u.username.unwrap_or_else(|| "Trader".to_string()),
            },
        );
    }

    Ok(map)
}

/// Mongo-backed directory handed to the evaluation engine.
pub struct MongoUsers {
    db: Database,
}

impl MongoUsers {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for MongoUsers {
    async fn resolve(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, Recipient>, String> {
        resolve_recipients(&self.db, ids).await
    }
}
