//! Library entrypoint for Quantivo.
//!
//! This file exists mainly to make controller and engine tests easy
//! (integration tests under `tests/` can import the app state, routers,
//! controllers, services).

pub mod config;
pub mod models;

// Keep this module at crate root because the codebase references it as
// `crate::auth`.
#[path = "middleware/auth.rs"]
pub mod auth;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: mongodb::Database,
    pub settings: config::Settings,
    pub finnhub: services::finnhub::FinnhubClient,
    pub events_tx: tokio::sync::broadcast::Sender<String>,
}
