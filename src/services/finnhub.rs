use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Price snapshot handed to the evaluation engine. Absence of a quote is an
/// error variant, never a zero price.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub price: f64,
    pub change_percent: Option<f64>,
}

#[derive(Debug, Error)]
pub enum FinnhubError {
    // Missing API key. Callers degrade (skip the cycle) instead of failing.
    #[error("FINNHUB_API_KEY is not configured")]
    Unconfigured,

    #[error("finnhub request failed: {0}")]
    Transport(String),

    #[error("finnhub responded with status {0}")]
    Status(reqwest::StatusCode),

    // Response parsed but carried no usable price (Finnhub reports c=0 for
    // unknown symbols), or the body was not the expected shape.
    #[error("finnhub response had no usable price")]
    MissingPrice,
}

impl FinnhubError {
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, FinnhubError::Unconfigured)
    }
}

#[derive(Clone)]
pub struct FinnhubClient {
    http: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub async fn quote(&self, symbol: &str) -> Result<Quote, FinnhubError> {
        if !self.has_key() {
            return Err(FinnhubError::Unconfigured);
        }

        let url = "https://finnhub.io/api/v1/quote";
        let res = self
            .http
            .get(url)
            .query(&[("symbol", symbol), ("token", &self.api_key)])
            .send()
            .await
            .map_err(|e| FinnhubError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            return Err(FinnhubError::Status(res.status()));
        }

        let raw = res
            .json::<QuoteResponse>()
            .await
            .map_err(|_| FinnhubError::MissingPrice)?;

        if !raw.c.is_finite() || raw.c <= 0.0 {
            return Err(FinnhubError::MissingPrice);
        }

        Ok(Quote {
            price: raw.c,
            change_percent: raw.dp.filter(|dp| dp.is_finite()),
        })
    }

    pub async fn search(&self, q: &str) -> Result<SearchResponse, FinnhubError> {
        if !self.has_key() {
            return Err(FinnhubError::Unconfigured);
        }

        let url = "https://finnhub.io/api/v1/search";
        let res = self
            .http
            .get(url)
            .query(&[("q", q), ("token", &self.api_key)])
            .send()
            .await
            .map_err(|e| FinnhubError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            return Err(FinnhubError::Status(res.status()));
        }

        res.json::<SearchResponse>()
            .await
            .map_err(|_| FinnhubError::MissingPrice)
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchResponse {
    pub count: i64,
    pub result: Vec<SearchItem>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SearchItem {
    pub description: String,

    #[serde(rename = "displaySymbol")]
    pub display_symbol: String,

    pub symbol: String,

    #[serde(rename = "type")]
    pub kind: String,
}

// Finnhub /quote wire shape.
#[derive(Debug, Deserialize)]
struct QuoteResponse {
    // current price
    #[serde(default)]
    c: f64,
    // percent change
    #[serde(default)]
    dp: Option<f64>,
}
