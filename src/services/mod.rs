pub mod finnhub;
pub mod db_init;
pub mod mailer;

pub mod alert_engine;
pub mod alert_scheduler;

pub mod auth_service;
pub mod alerts_service;
pub mod watchlist_service;
pub mod user_service;
