use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// One tracked symbol on a user's watchlist; unique per (user_id, symbol).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchlistItem {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,
    pub company: String,

    #[serde(default)]
    pub is_favorite: bool,

    pub added_at: i64,
}
