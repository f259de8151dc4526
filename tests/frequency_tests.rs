use chrono::{TimeZone, Utc};

use quantivo::models::Frequency;
use quantivo::services::alert_scheduler::{next_fire, pass_deadline};
use quantivo::services::alerts_service::active_filter;

#[test]
fn canonical_codes_parse_to_their_tier() {
    assert_eq!(Frequency::parse("1"), Some(Frequency::Minute));
    assert_eq!(Frequency::parse("2"), Some(Frequency::Hour));
    assert_eq!(Frequency::parse("3"), Some(Frequency::Day));
}

#[test]
fn legacy_labels_parse_to_their_tier() {
    assert_eq!(Frequency::parse("Once per minute"), Some(Frequency::Minute));
    assert_eq!(Frequency::parse("Once per hour"), Some(Frequency::Hour));
    assert_eq!(Frequency::parse("Once per day"), Some(Frequency::Day));
}

#[test]
fn unknown_frequencies_are_rejected() {
    assert_eq!(Frequency::parse(""), None);
    assert_eq!(Frequency::parse("4"), None);
    assert_eq!(Frequency::parse("weekly"), None);
    assert_eq!(Frequency::parse("once per day"), None);
}

#[test]
fn matches_accepts_code_and_alias_with_whitespace() {
    assert!(Frequency::Day.matches("3"));
    assert!(Frequency::Day.matches("Once per day"));
    assert!(Frequency::Day.matches(" 3 "));
    assert!(!Frequency::Day.matches("1"));
    assert!(!Frequency::Minute.matches("Once per day"));
}

#[test]
fn active_filter_targets_active_rows_and_all_tier_spellings() {
    let filter = active_filter(Frequency::Day);

    assert!(filter.get_bool("is_active").unwrap());

    let freq = filter.get_document("frequency").unwrap();
    let values: Vec<&str> = freq
        .get_array("$in")
        .unwrap()
        .iter()
        .filter_map(|b| b.as_str())
        .collect();

    assert!(values.contains(&"3"));
    assert!(values.contains(&"Once per day"));
}

#[test]
fn minute_tier_fires_at_the_next_minute_boundary() {
    let after = Utc.with_ymd_and_hms(2025, 3, 1, 12, 34, 56).unwrap();
    let next = next_fire(Frequency::Minute, after, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 0).unwrap());
}

#[test]
fn minute_tier_on_a_boundary_fires_strictly_in_the_future() {
    let after = Utc.with_ymd_and_hms(2025, 3, 1, 12, 34, 0).unwrap();
    let next = next_fire(Frequency::Minute, after, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 12, 35, 0).unwrap());
}

#[test]
fn hour_tier_fires_at_minute_zero_of_the_next_hour() {
    let after = Utc.with_ymd_and_hms(2025, 3, 1, 12, 34, 56).unwrap();
    let next = next_fire(Frequency::Hour, after, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap());

    let boundary = Utc.with_ymd_and_hms(2025, 3, 1, 13, 0, 0).unwrap();
    let next = next_fire(Frequency::Hour, boundary, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 14, 0, 0).unwrap());
}

#[test]
fn day_tier_fires_at_the_configured_hour() {
    let morning = Utc.with_ymd_and_hms(2025, 3, 1, 8, 15, 0).unwrap();
    let next = next_fire(Frequency::Day, morning, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap());

    let evening = Utc.with_ymd_and_hms(2025, 3, 1, 15, 0, 0).unwrap();
    let next = next_fire(Frequency::Day, evening, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap());
}

#[test]
fn day_tier_exactly_at_the_hour_rolls_to_tomorrow() {
    let noon = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let next = next_fire(Frequency::Day, noon, 12);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 2, 12, 0, 0).unwrap());
}

#[test]
fn day_tier_honours_a_custom_hour() {
    let after = Utc.with_ymd_and_hms(2025, 3, 1, 1, 30, 0).unwrap();
    let next = next_fire(Frequency::Day, after, 6);
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap());
}

#[test]
fn pass_deadlines_sit_comfortably_below_each_tier_period() {
    assert!(pass_deadline(Frequency::Minute).as_secs() < 60);
    assert!(pass_deadline(Frequency::Hour).as_secs() < 3600);
    assert!(pass_deadline(Frequency::Day).as_secs() < 86400);
}
