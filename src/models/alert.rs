use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A standing instruction to notify the owner when a symbol's price crosses
/// a threshold. Evaluation never mutates these documents — an alert keeps
/// firing every cycle it stays past threshold until the owner disables or
/// deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,
    pub company: String,

    pub alert_type: AlertType,
    pub threshold: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_name: Option<String>,

    // Canonical short code ("1" | "2" | "3"). Older documents may still
    // carry the full label ("Once per day"); queries must match both.
    #[serde(default = "default_frequency")]
    pub frequency: String,

    #[serde(default = "default_active")]
    pub is_active: bool,

    pub created_at: i64,
}

fn default_frequency() -> String {
    Frequency::Day.code().to_string()
}

fn default_active() -> bool {
    true
}

/// Direction of the trigger. Comparison is closed-interval: an exact match
/// at the threshold fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Upper,
    Lower,
}

impl AlertType {
    pub fn is_hit(self, price: f64, threshold: f64) -> bool {
        match self {
            AlertType::Upper => price >= threshold,
            AlertType::Lower => price <= threshold,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::Upper => "upper",
            AlertType::Lower => "lower",
        }
    }
}

/// Evaluation cadence. The three tiers are a closed set; every piece of
/// tier matching goes through the alias table below rather than ad-hoc
/// string comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Minute,
    Hour,
    Day,
}

impl Frequency {
    pub const ALL: [Frequency; 3] = [Frequency::Minute, Frequency::Hour, Frequency::Day];

    /// Canonical stored code.
    pub fn code(self) -> &'static str {
        match self {
            Frequency::Minute => "1",
            Frequency::Hour => "2",
            Frequency::Day => "3",
        }
    }

    /// Every stored value this tier must match: the canonical code plus the
    /// legacy long-form label older documents were written with.
    pub fn accepted_values(self) -> &'static [&'static str] {
        match self {
            Frequency::Minute => &["1", "Once per minute"],
            Frequency::Hour => &["2", "Once per hour"],
            Frequency::Day => &["3", "Once per day"],
        }
    }

    /// Tier name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Frequency::Minute => "minute",
            Frequency::Hour => "hour",
            Frequency::Day => "day",
        }
    }

    /// Parse a stored or user-supplied value, tolerating legacy labels.
    pub fn parse(raw: &str) -> Option<Frequency> {
        let raw = raw.trim();
        Frequency::ALL
            .into_iter()
            .find(|f| f.accepted_values().contains(&raw))
    }

    /// Whether a stored frequency value belongs to this tier.
    pub fn matches(self, raw: &str) -> bool {
        self.accepted_values().contains(&raw.trim())
    }
}
