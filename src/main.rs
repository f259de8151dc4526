use std::net::SocketAddr;
use std::sync::Arc;

use mongodb::Client;

use quantivo::services::alert_engine::AlertEngine;
use quantivo::services::alert_scheduler;
use quantivo::services::alerts_service::MongoAlerts;
use quantivo::services::user_service::MongoUsers;
use quantivo::{config, routes, services, AppState};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let settings = config::load();

    // Mongo connection
    let client = Client::with_uri_str(&settings.mongodb_uri)
        .await
        .expect("Failed to connect to MongoDB");
    let db = client.database(&settings.mongodb_db);

    if let Err(e) = services::db_init::ensure_indexes(&db).await {
        tracing::warn!("index bootstrap failed: {e}");
    }

    let finnhub = services::finnhub::FinnhubClient::new(settings.finnhub_api_key.clone());
    if settings.finnhub_api_key.trim().is_empty() {
        tracing::warn!("FINNHUB_API_KEY not set; quotes unavailable, alert passes will skip");
    }

    let mailer = services::mailer::Mailer::from_settings(&settings);
    if !mailer.is_configured() {
        tracing::warn!("SMTP not configured; alert emails will be skipped");
    }

    let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<String>(32);

    let state = AppState {
        db: db.clone(),
        settings: settings.clone(),
        finnhub: finnhub.clone(),
        events_tx,
    };

    // Background alert pipeline: one scheduler task per frequency tier.
    let engine = Arc::new(AlertEngine::new(
        Arc::new(MongoAlerts::new(db.clone())),
        Arc::new(finnhub),
        Arc::new(MongoUsers::new(db)),
        Arc::new(mailer),
    ));
    alert_scheduler::spawn_alert_schedulers(engine, settings.alert_daily_hour);

    let app = routes::app(state);

    let addr = SocketAddr::from((settings.host.parse::<std::net::IpAddr>().unwrap(), settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
