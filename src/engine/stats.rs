//! Track record over settled predictions.

use crate::model::{Outcome, Prediction};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackRecord {
    pub total: usize,
    pub won: usize,
    pub lost: usize,
    pub pending: usize,
    /// won / (won + lost); `None` until something settles.
    pub success_rate: Option<f64>,
    /// Consecutive wins among the most recently settled tips.
    pub win_streak: u32,
    /// Return per unit staked at best quoted decimal odds. Only settled
    /// tips that carry odds count.
    pub roi: Option<f64>,
}

pub fn track_record(records: &[Prediction]) -> TrackRecord {
    let mut rec = TrackRecord {
        total: records.len(),
        ..Default::default()
    };

    let mut staked = 0.0;
    let mut returned = 0.0;

    for p in records {
        match p.result {
            Outcome::Won => rec.won += 1,
            Outcome::Lost => rec.lost += 1,
            Outcome::Pending => rec.pending += 1,
        }
        if let (true, Some(price)) = (p.result.is_settled(), p.best_price()) {
            staked += 1.0;
            if p.result == Outcome::Won {
                returned += price;
            }
        }
    }

    let settled = rec.won + rec.lost;
    if settled > 0 {
        rec.success_rate = Some(rec.won as f64 / settled as f64);
    }
    if staked > 0.0 {
        rec.roi = Some((returned - staked) / staked);
    }

    let mut settled_tips: Vec<&Prediction> = records.iter().filter(|p| p.result.is_settled()).collect();
    settled_tips.sort_by(|a, b| b.match_date.cmp(&a.match_date));
    rec.win_streak = settled_tips
        .iter()
        .take_while(|p| p.result == Outcome::Won)
        .count() as u32;

    rec
}

/// "78%", or a dash before anything settles.
pub fn format_rate(rate: Option<f64>) -> String {
    rate.map_or_else(|| "—".to_string(), |r| format!("{:.0}%", r * 100.0))
}

/// "+23%" / "-4%".
pub fn format_roi(roi: Option<f64>) -> String {
    roi.map_or_else(|| "—".to_string(), |r| format!("{:+.0}%", r * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, Odds, PredictionType};
    use chrono::{TimeZone, Utc};

    fn settled(id: &str, day: u32, result: Outcome, price: Option<f64>) -> Prediction {
        let mut p = fixtures::prediction(
            id,
            PredictionType::Single,
            Utc.with_ymd_and_hms(2024, 3, day, 15, 0, 0).unwrap(),
        );
        p.result = result;
        p.odds = price.map(|x| Odds::from([("Bet365".to_string(), x)])).unwrap_or_default();
        p
    }

    #[test]
    fn test_empty_record() {
        let rec = track_record(&[]);
        assert_eq!(rec, TrackRecord::default());
        assert_eq!(format_rate(rec.success_rate), "—");
    }

    #[test]
    fn test_counts_and_rate() {
        let records = vec![
            settled("a", 1, Outcome::Won, Some(2.0)),
            settled("b", 2, Outcome::Lost, Some(1.5)),
            settled("c", 3, Outcome::Won, Some(3.0)),
            settled("d", 4, Outcome::Won, None),
            settled("e", 5, Outcome::Pending, Some(1.8)),
        ];
        let rec = track_record(&records);
        assert_eq!((rec.total, rec.won, rec.lost, rec.pending), (5, 3, 1, 1));
        assert_eq!(format_rate(rec.success_rate), "75%");
        // staked 3 (a, b, c), returned 2.0 + 3.0
        let roi = rec.roi.unwrap();
        assert!((roi - (5.0 - 3.0) / 3.0).abs() < 1e-9);
        assert_eq!(format_roi(rec.roi), "+67%");
    }

    #[test]
    fn test_streak_uses_most_recent_settled_regardless_of_input_order() {
        let records = vec![
            settled("d", 4, Outcome::Won, None),
            settled("a", 1, Outcome::Won, None),
            settled("b", 2, Outcome::Lost, None),
            settled("e", 5, Outcome::Pending, None),
            settled("c", 3, Outcome::Won, None),
        ];
        assert_eq!(track_record(&records).win_streak, 2);
    }

    #[test]
    fn test_streak_broken_by_latest_loss() {
        let records = vec![
            settled("a", 1, Outcome::Won, None),
            settled("b", 2, Outcome::Lost, None),
        ];
        assert_eq!(track_record(&records).win_streak, 0);
    }
}
