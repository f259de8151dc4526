use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use quantivo::models::{Alert, AlertType, Frequency};
use quantivo::services::alert_engine::{
    ActiveAlertSource, AlertEngine, AlertNotifier, EvaluationSummary, QuoteSource, UserDirectory,
};
use quantivo::services::finnhub::{FinnhubError, Quote};
use quantivo::services::mailer::PriceAlertEmail;
use quantivo::services::user_service::Recipient;

fn make_alert(
    user: ObjectId,
    symbol: &str,
    alert_type: AlertType,
    threshold: f64,
    frequency: &str,
    active: bool,
) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: user,
        symbol: symbol.to_string(),
        company: format!("{symbol} Inc."),
        alert_type,
        threshold,
        alert_name: None,
        frequency: frequency.to_string(),
        is_active: active,
        created_at: Utc::now().timestamp(),
    }
}

struct FakeAlerts {
    alerts: Vec<Alert>,
    fail: bool,
}

impl FakeAlerts {
    fn new(alerts: Vec<Alert>) -> Arc<Self> {
        Arc::new(Self {
            alerts,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            alerts: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl ActiveAlertSource for FakeAlerts {
    async fn list_active(&self, tier: Frequency) -> Result<Vec<Alert>, String> {
        if self.fail {
            return Err("store down".to_string());
        }
        // Mirrors the store filter: active rows whose stored frequency is
        // the tier's code or a recognized legacy alias.
        Ok(self
            .alerts
            .iter()
            .filter(|a| a.is_active && tier.matches(&a.frequency))
            .cloned()
            .collect())
    }
}

struct FakeQuotes {
    prices: HashMap<String, f64>,
    failing: HashSet<String>,
    unconfigured: bool,
    calls: Mutex<Vec<String>>,
}

impl FakeQuotes {
    fn new(prices: &[(&str, f64)]) -> Arc<Self> {
        Arc::new(Self {
            prices: prices
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
            failing: HashSet::new(),
            unconfigured: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn with_failing(prices: &[(&str, f64)], failing: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            prices: prices
                .iter()
                .map(|(s, p)| (s.to_string(), *p))
                .collect(),
            failing: failing.iter().map(|s| s.to_string()).collect(),
            unconfigured: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn unconfigured() -> Arc<Self> {
        Arc::new(Self {
            prices: HashMap::new(),
            failing: HashSet::new(),
            unconfigured: true,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn called_symbols(&self) -> Vec<String> {
        let mut v = self.calls.lock().unwrap().clone();
        v.sort();
        v
    }
}

#[async_trait]
impl QuoteSource for FakeQuotes {
    async fn quote(&self, symbol: &str) -> Result<Quote, FinnhubError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        if self.unconfigured {
            return Err(FinnhubError::Unconfigured);
        }
        if self.failing.contains(symbol) {
            return Err(FinnhubError::Transport("connection reset".to_string()));
        }
        match self.prices.get(symbol) {
            Some(p) => Ok(Quote {
                price: *p,
                change_percent: None,
            }),
            None => Err(FinnhubError::MissingPrice),
        }
    }
}

struct FakeUsers {
    users: HashMap<ObjectId, Recipient>,
}

impl FakeUsers {
    fn with(ids: &[ObjectId]) -> Arc<Self> {
        Arc::new(Self {
            users: ids
                .iter()
                .enumerate()
                .map(|(i, id)| {
                    (
                        *id,
                        Recipient {
                            email: format!("trader{i}@example.com"),
                            name: format!("Trader {i}"),
                        },
                    )
                })
                .collect(),
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            users: HashMap::new(),
        })
    }
}

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn resolve(&self, ids: &[ObjectId]) -> Result<HashMap<ObjectId, Recipient>, String> {
        Ok(ids
            .iter()
            .filter_map(|id| self.users.get(id).map(|r| (*id, r.clone())))
            .collect())
    }
}

struct FakeNotifier {
    sent: Mutex<Vec<PriceAlertEmail>>,
    fail_for_symbols: HashSet<String>,
}

impl FakeNotifier {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for_symbols: HashSet::new(),
        })
    }

    fn failing_for(symbols: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail_for_symbols: symbols.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn sent_symbols(&self) -> Vec<String> {
        let mut v: Vec<String> = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.symbol.clone())
            .collect();
        v.sort();
        v
    }
}

#[async_trait]
impl AlertNotifier for FakeNotifier {
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), String> {
        if self.fail_for_symbols.contains(&email.symbol) {
            return Err("smtp refused".to_string());
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[tokio::test]
async fn upper_alert_triggers_on_threshold_equality() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![make_alert(
        user,
        "AAPL",
        AlertType::Upper,
        150.0,
        "1",
        true,
    )]);
    let quotes = FakeQuotes::new(&[("AAPL", 150.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 1,
            sent: 1
        }
    );
    assert_eq!(notifier.sent_symbols(), vec!["AAPL".to_string()]);
}

#[tokio::test]
async fn upper_alert_does_not_trigger_just_below_threshold() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![make_alert(
        user,
        "AAPL",
        AlertType::Upper,
        150.0,
        "1",
        true,
    )]);
    let quotes = FakeQuotes::new(&[("AAPL", 149.99)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 1,
            sent: 0
        }
    );
    assert!(notifier.sent_symbols().is_empty());
}

#[tokio::test]
async fn lower_alert_triggers_on_threshold_equality() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![make_alert(
        user,
        "TSLA",
        AlertType::Lower,
        180.0,
        "1",
        true,
    )]);
    let quotes = FakeQuotes::new(&[("TSLA", 180.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier);
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(summary.sent, 1);
}

#[tokio::test]
async fn quote_fetches_are_deduplicated_per_distinct_symbol() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "TSLA", AlertType::Upper, 100.0, "1", true),
        make_alert(user, "TSLA", AlertType::Upper, 120.0, "1", true),
        make_alert(user, "TSLA", AlertType::Lower, 500.0, "1", true),
        make_alert(user, "AAPL", AlertType::Upper, 50.0, "1", true),
    ]);
    let quotes = FakeQuotes::new(&[("TSLA", 200.0), ("AAPL", 150.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes.clone(), users, notifier);
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(summary.processed, 4);
    assert_eq!(summary.sent, 4);
    assert_eq!(quotes.call_count(), 2);
    assert_eq!(
        quotes.called_symbols(),
        vec!["AAPL".to_string(), "TSLA".to_string()]
    );
}

#[tokio::test]
async fn price_between_upper_and_lower_thresholds_sends_nothing() {
    // upper @ 200 and lower @ 150, quote at 180: neither fires, one fetch.
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "TSLA", AlertType::Upper, 200.0, "1", true),
        make_alert(user, "TSLA", AlertType::Lower, 150.0, "1", true),
    ]);
    let quotes = FakeQuotes::new(&[("TSLA", 180.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes.clone(), users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 2,
            sent: 0
        }
    );
    assert_eq!(quotes.call_count(), 1);
    assert!(notifier.sent_symbols().is_empty());
}

#[tokio::test]
async fn inactive_alerts_are_never_evaluated() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "AAPL", AlertType::Upper, 100.0, "1", true),
        make_alert(user, "MSFT", AlertType::Upper, 1.0, "1", false),
    ]);
    let quotes = FakeQuotes::new(&[("AAPL", 150.0), ("MSFT", 400.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes.clone(), users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 1,
            sent: 1
        }
    );
    assert_eq!(notifier.sent_symbols(), vec!["AAPL".to_string()]);
    // the inactive alert's symbol is never even fetched
    assert_eq!(quotes.called_symbols(), vec!["AAPL".to_string()]);
}

#[tokio::test]
async fn failed_quote_skips_that_symbol_but_not_others() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "AAPL", AlertType::Upper, 100.0, "1", true),
        make_alert(user, "TSLA", AlertType::Upper, 100.0, "1", true),
    ]);
    let quotes = FakeQuotes::with_failing(&[("TSLA", 200.0)], &["AAPL"]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 2,
            sent: 1
        }
    );
    assert_eq!(notifier.sent_symbols(), vec!["TSLA".to_string()]);
}

#[tokio::test]
async fn alert_with_unknown_owner_is_skipped() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![make_alert(
        user,
        "AAPL",
        AlertType::Upper,
        100.0,
        "1",
        true,
    )]);
    let quotes = FakeQuotes::new(&[("AAPL", 150.0)]);
    let users = FakeUsers::empty();
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 1,
            sent: 0
        }
    );
    assert!(notifier.sent_symbols().is_empty());
}

#[tokio::test]
async fn failed_send_is_excluded_from_sent_and_does_not_abort_others() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "AAPL", AlertType::Upper, 100.0, "1", true),
        make_alert(user, "TSLA", AlertType::Upper, 100.0, "1", true),
    ]);
    let quotes = FakeQuotes::new(&[("AAPL", 150.0), ("TSLA", 200.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::failing_for(&["AAPL"]);

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 2,
            sent: 1
        }
    );
    assert_eq!(notifier.sent_symbols(), vec!["TSLA".to_string()]);
}

#[tokio::test]
async fn evaluation_is_idempotent_across_passes() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![make_alert(
        user,
        "AAPL",
        AlertType::Upper,
        100.0,
        "1",
        true,
    )]);
    let quotes = FakeQuotes::new(&[("AAPL", 150.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let first = engine.evaluate(Frequency::Minute).await;
    let second = engine.evaluate(Frequency::Minute).await;

    // No edge detection and no accumulated state: the alert re-fires on
    // every pass it stays past threshold.
    assert_eq!(first, second);
    assert_eq!(notifier.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn unconfigured_quote_provider_processes_without_sending() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "AAPL", AlertType::Upper, 100.0, "1", true),
        make_alert(user, "TSLA", AlertType::Lower, 500.0, "1", true),
        make_alert(user, "MSFT", AlertType::Upper, 1.0, "1", true),
    ]);
    let quotes = FakeQuotes::unconfigured();
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(
        summary,
        EvaluationSummary {
            processed: 3,
            sent: 0
        }
    );
    assert!(notifier.sent_symbols().is_empty());
}

#[tokio::test]
async fn empty_tier_short_circuits_without_downstream_calls() {
    let alerts = FakeAlerts::new(Vec::new());
    let quotes = FakeQuotes::new(&[("AAPL", 150.0)]);
    let users = FakeUsers::empty();
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes.clone(), users, notifier);
    let summary = engine.evaluate(Frequency::Minute).await;

    assert_eq!(summary, EvaluationSummary::default());
    assert_eq!(quotes.call_count(), 0);
}

#[tokio::test]
async fn store_failure_aborts_pass_with_zero_summary() {
    let alerts = FakeAlerts::failing();
    let quotes = FakeQuotes::new(&[]);
    let users = FakeUsers::empty();
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes.clone(), users, notifier);
    let summary = engine.evaluate(Frequency::Hour).await;

    assert_eq!(summary, EvaluationSummary::default());
    assert_eq!(quotes.call_count(), 0);
}

#[tokio::test]
async fn legacy_frequency_label_matches_its_tier() {
    let user = ObjectId::new();
    let alerts = FakeAlerts::new(vec![
        make_alert(user, "AAPL", AlertType::Upper, 100.0, "Once per day", true),
        make_alert(user, "TSLA", AlertType::Upper, 100.0, "1", true),
    ]);
    let quotes = FakeQuotes::new(&[("AAPL", 150.0), ("TSLA", 200.0)]);
    let users = FakeUsers::with(&[user]);
    let notifier = FakeNotifier::new();

    let engine = AlertEngine::new(alerts, quotes, users, notifier.clone());

    let daily = engine.evaluate(Frequency::Day).await;
    assert_eq!(
        daily,
        EvaluationSummary {
            processed: 1,
            sent: 1
        }
    );
    assert_eq!(notifier.sent_symbols(), vec!["AAPL".to_string()]);

    let minute = engine.evaluate(Frequency::Minute).await;
    assert_eq!(
        minute,
        EvaluationSummary {
            processed: 1,
            sent: 1
        }
    );
}
