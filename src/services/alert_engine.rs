use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::join_all;
use mongodb::bson::oid::ObjectId;

use crate::models::{Alert, Frequency};
use crate::services::finnhub::{FinnhubError, Quote};
use crate::services::mailer::PriceAlertEmail;
use crate::services::user_service::Recipient;

/// What one evaluation pass reports back to the scheduler: how many alerts
/// were loaded for the tier and how many notifications actually went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationSummary {
    pub processed: usize,
    pub sent: usize,
}

#[async_trait]
pub trait ActiveAlertSource: Send + Sync {
    async fn list_active(&self, tier: Frequency) -> Result<Vec<Alert>, String>;
}

#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, FinnhubError>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn resolve(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, Recipient>, String>;
}

#[async_trait]
pub trait AlertNotifier: Send + Sync {
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), String>;
}

/// Evaluates one frequency tier per call: load the tier's active alerts,
/// fetch one quote per distinct symbol, resolve owners in bulk, compare, and
/// dispatch one email per triggered alert. Holds no state between passes —
/// an alert that stays past its threshold re-fires on every pass until its
/// owner disables or deletes it.
pub struct AlertEngine {
    alerts: Arc<dyn ActiveAlertSource>,
    quotes: Arc<dyn QuoteSource>,
    users: Arc<dyn UserDirectory>,
    notifier: Arc<dyn AlertNotifier>,
}

impl AlertEngine {
    pub fn new(
        alerts: Arc<dyn ActiveAlertSource>,
        quotes: Arc<dyn QuoteSource>,
        users: Arc<dyn UserDirectory>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Self {
        Self {
            alerts,
            quotes,
            users,
            notifier,
        }
    }

    pub async fn evaluate(&self, tier: Frequency) -> EvaluationSummary {
        let alerts = match self.alerts.list_active(tier).await {
            Ok(alerts) => alerts,
            Err(e) => {
                // Store down: abort this pass, the next tick retries.
                tracing::warn!(tier = tier.name(), "alert store unavailable: {e}");
                return EvaluationSummary::default();
            }
        };

        if alerts.is_empty() {
            return EvaluationSummary::default();
        }

        let processed = alerts.len();

        // One fetch per distinct symbol, fanned out concurrently. A symbol
        // whose fetch fails is absent from the map and every alert on it is
        // skipped for this pass.
        let symbols: HashSet<String> = alerts.iter().map(|a| a.symbol.clone()).collect();
        let fetches = symbols.into_iter().map(|sym| async move {
            match self.quotes.quote(&sym).await {
                Ok(quote) => Some((sym, quote)),
                Err(e) if e.is_unconfigured() => {
                    tracing::debug!(symbol = %sym, "quote provider unconfigured, skipping");
                    None
                }
                Err(e) => {
                    tracing::warn!(symbol = %sym, "quote fetch failed: {e}");
                    None
                }
            }
        });
        let quote_map: HashMap<String, Quote> =
            join_all(fetches).await.into_iter().flatten().collect();

        // Owners resolved in one bulk call; an alert whose owner is missing
        // (or the whole lookup failing) skips silently.
        let user_ids: Vec<ObjectId> = alerts
            .iter()
            .map(|a| a.user_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let user_map = match self.users.resolve(&user_ids).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(tier = tier.name(), "user lookup failed: {e}");
                HashMap::new()
            }
        };

        let now = Utc::now();
        let pending: Vec<PriceAlertEmail> = alerts
            .iter()
            .filter_map(|alert| {
                let quote = quote_map.get(&alert.symbol)?;
                let recipient = user_map.get(&alert.user_id)?;

                if !alert.alert_type.is_hit(quote.price, alert.threshold) {
                    return None;
                }

                Some(PriceAlertEmail {
                    recipient_email: recipient.email.clone(),
                    recipient_name: recipient.name.clone(),
                    symbol: alert.symbol.clone(),
                    company: alert.company.clone(),
                    current_price: quote.price,
                    target_price: alert.threshold,
                    alert_type: alert.alert_type,
                    timestamp: now,
                })
            })
            .collect();

        // Sends run concurrently; a failed send is logged and excluded from
        // the count without touching the others.
        let outcomes = join_all(pending.into_iter().map(|email| async move {
            let symbol = email.symbol.clone();
            (symbol, self.notifier.send_price_alert(&email).await)
        }))
        .await;

        let mut sent = 0usize;
        for (symbol, outcome) in outcomes {
            match outcome {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!(symbol = %symbol, "alert email failed: {e}"),
            }
        }

        EvaluationSummary { processed, sent }
    }
}

#[async_trait]
impl QuoteSource for crate::services::finnhub::FinnhubClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, FinnhubError> {
        crate::services::finnhub::FinnhubClient::quote(self, symbol).await
    }
}
