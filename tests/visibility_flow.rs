// Integration tests for premium visibility and listing filters

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serde_json::json;
use tipster::engine::access::{self, Member, SubscriptionTier, ViewerContext};
use tipster::engine::listing::{self, DateWindow, TypeSelector};
use tipster::model::{Prediction, PredictionType};

fn row(id: &str, kind: &str, match_date: DateTime<Utc>, premium: bool) -> Prediction {
    serde_json::from_value(json!({
        "id": id,
        "league": "La Liga",
        "home_team": "Sevilla",
        "away_team": "Betis",
        "prediction_type": kind,
        "prediction": "Over 2.5",
        "confidence_score": 68,
        "odds": { "Bet365": 2.05 },
        "is_premium": premium,
        "match_date": match_date.to_rfc3339(),
        "result": "pending",
        "reasoning": "Derby form",
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2024-01-01T00:00:00Z"
    }))
    .unwrap()
}

fn member(tier: SubscriptionTier) -> ViewerContext {
    ViewerContext::member(Member {
        user_id: "u-1".to_string(),
        display_name: Some("Sam".to_string()),
        tier,
        is_admin: false,
    })
}

fn now() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2024, 5, 4, 9, 0, 0).unwrap().fixed_offset()
}

fn slate() -> Vec<Prediction> {
    let today = Utc.with_ymd_and_hms(2024, 5, 4, 19, 0, 0).unwrap();
    vec![
        row("1", "single", today, false),
        row("2", "multi", today, true),
        row("3", "jackpot", today + Duration::days(1), true),
        row("4", "single", today + Duration::days(3), false),
        row("5", "multi", today + Duration::days(10), false),
    ]
}

#[test]
fn test_premium_rows_lock_for_everyone_but_premium_members() {
    let rows = slate();
    let premium_row = &rows[1];

    for viewer in [ViewerContext::anonymous(), member(SubscriptionTier::Free)] {
        assert!(!access::can_reveal(&viewer, premium_row));
        assert!(access::present(&viewer, premium_row).is_locked());
    }
    assert!(access::can_reveal(&member(SubscriptionTier::Premium), premium_row));
    assert!(!access::present(&member(SubscriptionTier::Premium), premium_row).is_locked());
}

#[test]
fn test_free_rows_open_to_every_viewer() {
    let rows = slate();
    for viewer in [
        ViewerContext::anonymous(),
        member(SubscriptionTier::Free),
        member(SubscriptionTier::Premium),
    ] {
        assert!(access::can_reveal(&viewer, &rows[0]));
    }
}

#[test]
fn test_listing_today_then_week() {
    let rows = slate();
    let today: Vec<&str> = listing::filter(&rows, TypeSelector::All, DateWindow::Today, now())
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(today, vec!["1", "2"]);

    let week: Vec<&str> = listing::filter(&rows, TypeSelector::All, DateWindow::Week, now())
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    assert_eq!(week, vec!["1", "2", "3", "4"]);
}

#[test]
fn test_listing_by_type_across_all_dates() {
    let rows = slate();
    let multis = listing::filter(
        &rows,
        TypeSelector::Only(PredictionType::Multi),
        DateWindow::All,
        now(),
    );
    assert_eq!(multis.len(), 2);
    assert!(multis.iter().all(|p| p.prediction_type == PredictionType::Multi));
}

#[test]
fn test_named_filter_matches_typed_filter() {
    let rows = slate();
    let named = listing::filter_named(&rows, "jackpot", "tomorrow", now());
    let typed = listing::filter(
        &rows,
        TypeSelector::Only(PredictionType::Jackpot),
        DateWindow::Tomorrow,
        now(),
    );
    assert_eq!(named, typed);
    assert_eq!(named.len(), 1);
}

#[test]
fn test_named_filter_unknown_selector_returns_nothing() {
    let rows = slate();
    assert!(listing::filter_named(&rows, "accumulator", "today", now()).is_empty());
    assert!(listing::filter_named(&rows, "all", "fortnight", now()).is_empty());
}

#[test]
fn test_filtering_never_changes_visibility() {
    let rows = slate();
    let anon = ViewerContext::anonymous();
    for p in listing::filter(&rows, TypeSelector::All, DateWindow::All, now()) {
        assert_eq!(access::present(&anon, p).is_locked(), p.is_premium);
    }
}
