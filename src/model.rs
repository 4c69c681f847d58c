use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Bookmaker name -> decimal price.
pub type Odds = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionType {
    Single,
    Multi,
    Jackpot,
}

impl PredictionType {
    pub const ALL: [PredictionType; 3] = [Self::Single, Self::Multi, Self::Jackpot];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Multi => "multi",
            Self::Jackpot => "jackpot",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Single => "Single Bets",
            Self::Multi => "Multi-Bets",
            Self::Jackpot => "Jackpot",
        }
    }
}

impl fmt::Display for PredictionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "single" => Ok(Self::Single),
            "multi" => Ok(Self::Multi),
            "jackpot" => Ok(Self::Jackpot),
            other => anyhow::bail!("unknown prediction type: {:?}", other),
        }
    }
}

/// Settlement state of a prediction. Only `Pending -> Won | Lost` is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[default]
    Pending,
    Won,
    Lost,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }

    pub fn is_settled(self) -> bool {
        self != Self::Pending
    }

    pub fn can_transition_to(self, next: Outcome) -> bool {
        self == Self::Pending && next.is_settled()
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "won" => Ok(Self::Won),
            "lost" => Ok(Self::Lost),
            other => anyhow::bail!("unknown result: {:?}", other),
        }
    }
}

/// Confidence percentage, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Confidence(u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn new(value: i64) -> Option<Self> {
        (0..=100).contains(&value).then(|| Self(value as u8))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn band(self) -> ConfidenceBand {
        match self.0 {
            80..=u8::MAX => ConfidenceBand::High,
            60..=79 => ConfidenceBand::Medium,
            _ => ConfidenceBand::Low,
        }
    }
}

impl TryFrom<i64> for Confidence {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("confidence score {} outside 0..=100", value))
    }
}

impl From<Confidence> for u8 {
    fn from(c: Confidence) -> u8 {
        c.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// A row of the `predictions` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    #[serde(default)]
    pub match_id: Option<String>,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub prediction_type: PredictionType,
    pub prediction: String,
    #[serde(default)]
    pub confidence_score: Option<Confidence>,
    #[serde(default, deserialize_with = "lenient_odds")]
    pub odds: Odds,
    #[serde(default)]
    pub is_premium: bool,
    pub match_date: DateTime<Utc>,
    #[serde(default)]
    pub result: Outcome,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Prediction {
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.home_team, self.away_team)
    }

    /// Highest decimal price across bookmakers, if any are quoted.
    pub fn best_price(&self) -> Option<f64> {
        self.odds
            .values()
            .copied()
            .filter(|p| p.is_finite())
            .fold(None, |best: Option<f64>, p| Some(best.map_or(p, |b| b.max(p))))
    }
}

/// Odds are stored as free-form JSON. `null` reads as no quotes, and
/// prices entered as strings ("1.85") are accepted.
fn lenient_odds<'de, D>(deserializer: D) -> Result<Odds, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_json::Value>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(bookmaker, price)| {
            let price = match price {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((bookmaker, price))
        })
        .collect())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn prediction(id: &str, kind: PredictionType, match_date: DateTime<Utc>) -> Prediction {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        Prediction {
            id: id.to_string(),
            match_id: None,
            league: "Premier League".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            prediction_type: kind,
            prediction: "Home Win".to_string(),
            confidence_score: Confidence::new(75),
            odds: Odds::from([("Bet365".to_string(), 1.85), ("Betway".to_string(), 1.9)]),
            is_premium: false,
            match_date,
            result: Outcome::Pending,
            reasoning: Some("Unbeaten at home".to_string()),
            created_by: None,
            created_at: created,
            updated_at: created,
        }
    }
}
