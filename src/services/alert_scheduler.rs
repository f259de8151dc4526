use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Timelike, Utc};

use crate::models::Frequency;
use crate::services::alert_engine::AlertEngine;

/// One background task per tier. Each loop sleeps until the tier's next
/// wall-clock boundary, runs a single evaluation pass under a deadline, and
/// only then computes the next fire time — a tick that lands while a pass is
/// still running is skipped, never queued. Tiers are fully independent.
pub fn spawn_alert_schedulers(engine: Arc<AlertEngine>, daily_hour: u32) {
    for tier in Frequency::ALL {
        spawn_tier(engine.clone(), tier, daily_hour);
    }
}

fn spawn_tier(engine: Arc<AlertEngine>, tier: Frequency, daily_hour: u32) {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let next = next_fire(tier, now, daily_hour);
            let wait = (next - now).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;

            let started = std::time::Instant::now();
            match tokio::time::timeout(pass_deadline(tier), engine.evaluate(tier)).await {
                Ok(summary) => {
                    tracing::info!(
                        tier = tier.name(),
                        processed = summary.processed,
                        sent = summary.sent,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "alert pass complete"
                    );
                }
                Err(_) => {
                    tracing::warn!(tier = tier.name(), "alert pass exceeded deadline, dropped");
                }
            }
        }
    });
}

/// Strictly-future fire instant for a tier: minute tier at second 0 of every
/// minute, hour tier at minute 0, day tier at `daily_hour`:00 UTC.
pub fn next_fire(tier: Frequency, after: DateTime<Utc>, daily_hour: u32) -> DateTime<Utc> {
    match tier {
        Frequency::Minute => truncate_to_minute(after + ChronoDuration::minutes(1)),
        Frequency::Hour => truncate_to_hour(after + ChronoDuration::hours(1)),
        Frequency::Day => {
            let today = after
                .date_naive()
                .and_hms_opt(daily_hour.min(23), 0, 0)
                .map(|n| n.and_utc())
                .unwrap_or(after);
            if today > after {
                today
            } else {
                today + ChronoDuration::days(1)
            }
        }
    }
}

/// Per-pass deadline, comfortably below the tier's own period.
pub fn pass_deadline(tier: Frequency) -> Duration {
    match tier {
        Frequency::Minute => Duration::from_secs(45),
        Frequency::Hour => Duration::from_secs(5 * 60),
        Frequency::Day => Duration::from_secs(15 * 60),
    }
}

fn truncate_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
