use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};

use crate::models::WatchlistItem;
use crate::AppState;

pub async fn list_watchlist(
    state: &AppState,
    user_id: ObjectId,
) -> Result<Vec<WatchlistItem>, String> {
    let watchlist = state.db.collection::<WatchlistItem>("watchlist");

    let find_opts = FindOptions::builder()
        .sort(doc! { "added_at": -1 })
        .build();

    let mut cursor = watchlist
        .find(doc! { "user_id": user_id }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items: Vec<WatchlistItem> = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

pub async fn add_to_watchlist(
    state: &AppState,
    user_id: ObjectId,
    symbol: &str,
    company: &str,
) -> Result<WatchlistItem, String> {
    let sym = symbol.to_uppercase();
    let watchlist = state.db.collection::<WatchlistItem>("watchlist");

    let item = WatchlistItem {
        id: ObjectId::new(),
        user_id,
        symbol: sym.clone(),
        company: company.trim().to_string(),
        is_favorite: false,
        added_at: Utc::now().timestamp(),
    };

    if let Err(e) = watchlist.insert_one(&item, None).await {
        let msg = e.to_string();
        // Unique (user_id, symbol) index: already watched is not an error
        if msg.contains("E11000") {
            if let Ok(Some(existing)) = watchlist
                .find_one(doc! { "user_id": user_id, "symbol": &sym }, None)
                .await
            {
                return Ok(existing);
            }
        }
        return Err(msg);
    }

    let _ = state.events_tx.send("watchlistUpdated".to_string());

    Ok(item)
}

pub async fn remove_from_watchlist(
    state: &AppState,
    user_id: ObjectId,
    symbol: &str,
) -> Result<bool, String> {
    let sym = symbol.to_uppercase();
    let watchlist = state.db.collection::<WatchlistItem>("watchlist");

    let res = watchlist
        .delete_one(doc! { "user_id": user_id, "symbol": &sym }, None)
        .await
        .map_err(|e| e.to_string())?;

    if res.deleted_count > 0 {
        let _ = state.events_tx.send("watchlistUpdated".to_string());
    }

    Ok(res.deleted_count > 0)
}

pub async fn set_favorite(
    state: &AppState,
    user_id: ObjectId,
    symbol: &str,
    favorite: bool,
) -> Result<Option<WatchlistItem>, String> {
    let sym = symbol.to_uppercase();
    let watchlist = state.db.collection::<WatchlistItem>("watchlist");

    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    let updated = watchlist
        .find_one_and_update(
            doc! { "user_id": user_id, "symbol": &sym },
            doc! { "$set": { "is_favorite": favorite } },
            opts,
        )
        .await
        .map_err(|e| e.to_string())?;

    if updated.is_some() {
        let _ = state.events_tx.send("watchlistUpdated".to_string());
    }

    Ok(updated)
}
