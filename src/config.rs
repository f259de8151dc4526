use std::env;

#[derive(Debug, Clone)]
pub struct Settings {
    pub mongodb_uri: String,
    pub mongodb_db: String,
    pub host: String,
    pub port: u16,

    pub jwt_secret: String,
    pub jwt_cookie_name: String,
    pub cookie_secure: bool,

    pub finnhub_api_key: String,

    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub mail_from: String,

    // UTC hour at which the daily alert tier fires
    pub alert_daily_hour: u32,
}

pub fn load() -> Settings {
    // Loads .env if present (no crash if missing)
    dotenvy::dotenv().ok();

    let mongodb_uri = env::var("MONGODB_URI")
        .unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    let mongodb_db = env::var("MONGODB_DB")
        .unwrap_or_else(|_| "quantivo".to_string());

    let host = env::var("HOST")
        .unwrap_or_else(|_| "127.0.0.1".to_string());

    let port = env::var("PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| "change-me-dev-secret".to_string());
    let jwt_cookie_name = env::var("JWT_COOKIE_NAME").unwrap_or_else(|_| "auth".to_string());

    let cookie_secure = env::var("COOKIE_SECURE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Empty key => quote provider runs in "unconfigured" mode
    let finnhub_api_key = env::var("FINNHUB_API_KEY").unwrap_or_default();

    let smtp_host = env::var("SMTP_HOST").unwrap_or_default();
    let smtp_port = env::var("SMTP_PORT")
        .ok()
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(587);
    let smtp_username = env::var("SMTP_USERNAME").unwrap_or_default();
    let smtp_password = env::var("SMTP_PASSWORD").unwrap_or_default();
    let mail_from = env::var("MAIL_FROM")
        .unwrap_or_else(|_| "Quantivo Alerts <alerts@quantivo.app>".to_string());

    let alert_daily_hour = env::var("ALERT_DAILY_HOUR")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|h| *h < 24)
        .unwrap_or(12);

    Settings {
        mongodb_uri,
        mongodb_db,
        host,
        port,
        jwt_secret,
        jwt_cookie_name,
        cookie_secure,
        finnhub_api_key,
        smtp_host,
        smtp_port,
        smtp_username,
        smtp_password,
        mail_from,
        alert_daily_hour,
    }
}
