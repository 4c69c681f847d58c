//! Listing filter: narrows a match-date-ordered set of predictions by
//! prediction type and date window.
//!
//! `now` carries the viewer's UTC offset; "today" and "tomorrow" are
//! calendar days in that offset. The filter never reorders its input.

use crate::model::{Prediction, PredictionType};
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypeSelector {
    #[default]
    All,
    Only(PredictionType),
}

impl TypeSelector {
    pub const CYCLE: [TypeSelector; 4] = [
        Self::All,
        Self::Only(PredictionType::Single),
        Self::Only(PredictionType::Multi),
        Self::Only(PredictionType::Jackpot),
    ];

    /// `None` for anything unrecognized; callers fail closed.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            other => other.parse().ok().map(Self::Only),
        }
    }

    pub fn matches(self, kind: PredictionType) -> bool {
        match self {
            Self::All => true,
            Self::Only(t) => t == kind,
        }
    }

    /// Server-side narrowing for store queries.
    pub fn as_type(self) -> Option<PredictionType> {
        match self {
            Self::All => None,
            Self::Only(t) => Some(t),
        }
    }

    pub fn next(self) -> Self {
        let i = Self::CYCLE.iter().position(|s| *s == self).unwrap_or(0);
        Self::CYCLE[(i + 1) % Self::CYCLE.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All Tips",
            Self::Only(t) => t.label(),
        }
    }
}

impl fmt::Display for TypeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all types"),
            Self::Only(t) => f.write_str(t.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateWindow {
    #[default]
    Today,
    Tomorrow,
    Week,
    All,
}

impl DateWindow {
    pub const CYCLE: [DateWindow; 4] = [Self::Today, Self::Tomorrow, Self::Week, Self::All];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "today" => Some(Self::Today),
            "tomorrow" => Some(Self::Tomorrow),
            "week" => Some(Self::Week),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    pub fn contains(self, match_date: DateTime<Utc>, now: DateTime<FixedOffset>) -> bool {
        match self {
            Self::Today => local_day(match_date, now) == now.date_naive(),
            Self::Tomorrow => now
                .date_naive()
                .succ_opt()
                .is_some_and(|tomorrow| local_day(match_date, now) == tomorrow),
            Self::Week => {
                let start = now.with_timezone(&Utc);
                match_date >= start && match_date < start + Duration::days(7)
            }
            Self::All => true,
        }
    }

    pub fn next(self) -> Self {
        let i = Self::CYCLE.iter().position(|w| *w == self).unwrap_or(0);
        Self::CYCLE[(i + 1) % Self::CYCLE.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Today => "Today",
            Self::Tomorrow => "Tomorrow",
            Self::Week => "This Week",
            Self::All => "All Time",
        }
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Today => "today",
            Self::Tomorrow => "tomorrow",
            Self::Week => "week",
            Self::All => "all",
        };
        f.write_str(s)
    }
}

fn local_day(instant: DateTime<Utc>, now: DateTime<FixedOffset>) -> NaiveDate {
    instant.with_timezone(&now.timezone()).date_naive()
}

/// `[start, end)` of the local calendar day containing `now`, in UTC.
pub fn local_day_bounds(now: DateTime<FixedOffset>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let tz = now.timezone();
    let start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)?
        .and_local_timezone(tz)
        .single()?
        .with_timezone(&Utc);
    Some((start, start + Duration::days(1)))
}

pub fn filter<'a, I>(
    records: I,
    types: TypeSelector,
    window: DateWindow,
    now: DateTime<FixedOffset>,
) -> Vec<&'a Prediction>
where
    I: IntoIterator<Item = &'a Prediction>,
{
    records
        .into_iter()
        .filter(|p| types.matches(p.prediction_type))
        .filter(|p| window.contains(p.match_date, now))
        .collect()
}

/// String-typed entry point. An unrecognized selector matches nothing.
pub fn filter_named<'a, I>(
    records: I,
    type_name: &str,
    window_name: &str,
    now: DateTime<FixedOffset>,
) -> Vec<&'a Prediction>
where
    I: IntoIterator<Item = &'a Prediction>,
{
    match (TypeSelector::parse(type_name), DateWindow::parse(window_name)) {
        (Some(types), Some(window)) => filter(records, types, window, now),
        _ => {
            tracing::warn!(type_name, window_name, "unrecognized listing selector, returning nothing");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn now_utc() -> DateTime<FixedOffset> {
        at(2024, 3, 10, 0, 0, 0).fixed_offset()
    }

    fn ids(v: &[&Prediction]) -> Vec<String> {
        v.iter().map(|p| p.id.clone()).collect()
    }

    fn sample() -> Vec<Prediction> {
        vec![
            fixtures::prediction("past", PredictionType::Single, at(2024, 3, 9, 18, 0, 0)),
            fixtures::prediction("today", PredictionType::Single, at(2024, 3, 10, 15, 30, 0)),
            fixtures::prediction("tomorrow", PredictionType::Multi, at(2024, 3, 11, 20, 0, 0)),
            fixtures::prediction("late", PredictionType::Jackpot, at(2024, 3, 16, 23, 59, 59)),
            fixtures::prediction("edge", PredictionType::Single, at(2024, 3, 17, 0, 0, 0)),
        ]
    }

    #[test]
    fn test_all_all_is_identity() {
        let records = sample();
        let out = filter(&records, TypeSelector::All, DateWindow::All, now_utc());
        assert_eq!(ids(&out), ["past", "today", "tomorrow", "late", "edge"]);
    }

    #[test]
    fn test_today_vs_tomorrow() {
        let records = sample();
        let today = filter(&records, TypeSelector::All, DateWindow::Today, now_utc());
        let tomorrow = filter(&records, TypeSelector::All, DateWindow::Tomorrow, now_utc());
        assert_eq!(ids(&today), ["today"]);
        assert_eq!(ids(&tomorrow), ["tomorrow"]);
    }

    #[test]
    fn test_week_is_half_open() {
        let records = sample();
        let week = filter(&records, TypeSelector::All, DateWindow::Week, now_utc());
        // "past" already started, "edge" sits exactly at now + 7d
        assert_eq!(ids(&week), ["today", "tomorrow", "late"]);
    }

    #[test]
    fn test_type_narrowing() {
        let records = sample();
        let singles = filter(
            &records,
            TypeSelector::Only(PredictionType::Single),
            DateWindow::All,
            now_utc(),
        );
        assert_eq!(ids(&singles), ["past", "today", "edge"]);
    }

    #[test]
    fn test_empty_input() {
        let records: Vec<Prediction> = Vec::new();
        for types in TypeSelector::CYCLE {
            for window in DateWindow::CYCLE {
                assert!(filter(&records, types, window, now_utc()).is_empty());
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let records = sample();
        for types in TypeSelector::CYCLE {
            for window in DateWindow::CYCLE {
                let once = filter(&records, types, window, now_utc());
                let twice = filter(once.iter().copied(), types, window, now_utc());
                assert_eq!(once, twice);
            }
        }
    }

    #[test]
    fn test_local_offset_shifts_calendar_day() {
        // 23:30 UTC on the 10th is already the 11th in Nairobi (+03:00)
        let nairobi = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = nairobi.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let records = vec![fixtures::prediction("late-night", PredictionType::Single, at(2024, 3, 10, 23, 30, 0))];
        assert!(filter(&records, TypeSelector::All, DateWindow::Today, now).is_empty());
        assert_eq!(filter(&records, TypeSelector::All, DateWindow::Tomorrow, now).len(), 1);
    }

    #[test]
    fn test_unrecognized_selectors_fail_closed() {
        let records = sample();
        assert!(filter_named(&records, "all", "fortnight", now_utc()).is_empty());
        assert!(filter_named(&records, "parlay", "all", now_utc()).is_empty());
        assert_eq!(filter_named(&records, "ALL", "all", now_utc()).len(), records.len());
        assert_eq!(ids(&filter_named(&records, "multi", "tomorrow", now_utc())), ["tomorrow"]);
    }

    #[test]
    fn test_local_day_bounds() {
        let nairobi = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = nairobi.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        let (start, end) = local_day_bounds(now).unwrap();
        assert_eq!(start, at(2024, 3, 9, 21, 0, 0));
        assert_eq!(end, at(2024, 3, 10, 21, 0, 0));
    }

    #[test]
    fn test_selector_cycles_wrap() {
        assert_eq!(TypeSelector::Only(PredictionType::Jackpot).next(), TypeSelector::All);
        assert_eq!(DateWindow::All.next(), DateWindow::Today);
    }
}
