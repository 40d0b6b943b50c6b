use chrono::{NaiveDate, Utc};

use super::*;

fn fixed_now() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2025, 3, 9)
        .unwrap()
        .and_hms_opt(7, 5, 30)
        .unwrap()
        .and_utc()
}

#[test]
fn strftime_renders_date_and_time() {
    let now = fixed_now();
    assert_eq!(strftime(&now, "%Y-%m-%d"), "2025-03-09");
    assert_eq!(strftime(&now, "%H%M%S"), "070530");
}

#[test]
fn strftime_keeps_bad_patterns_verbatim() {
    let now = fixed_now();
    assert_eq!(strftime(&now, "%Q"), "%Q");
    assert_eq!(strftime(&now, "%Y-%"), "%Y-%");
}

#[test]
fn render_substitutes_in_order_and_trims_slashes() {
    let mut map = TokenMap::new();
    map.set("%date", "2025-03-09")
        .set("%time", "070530")
        .set("%seed", 42)
        .set("%image_format", "png")
        .set("%counter", format!("{:05}", 3));

    assert_eq!(
        map.render("%seed_%date_%time_final_OCS"),
        "42_2025-03-09_070530_final_OCS"
    );
    assert_eq!(map.render("%date/"), "2025-03-09");
    assert_eq!(map.render("/renders/%image_format/%counter/"), "renders/png/00003");
}

#[test]
fn unknown_tokens_are_left_verbatim() {
    let mut map = TokenMap::new();
    map.set("%seed", 1);
    assert_eq!(map.render("%seed-%nope"), "1-%nope");
}

#[test]
fn set_replaces_existing_token_in_place() {
    let mut map = TokenMap::new();
    map.set("%a", 1).set("%b", 2).set("%a", 3);
    assert_eq!(map.get("%a"), Some("3"));
    assert_eq!(map.render("%a%b"), "32");
}
