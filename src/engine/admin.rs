//! Admin-side writes: drafting new predictions and settling results.

use crate::engine::access::ViewerContext;
use crate::model::{Confidence, Odds, Outcome, Prediction, PredictionType};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONFIDENCE: i64 = 75;

#[derive(Error, Debug, PartialEq)]
pub enum AdminError {
    #[error("administrator access required")]
    NotAdmin,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("confidence score {0} must be between 0 and 100")]
    ConfidenceOutOfRange(i64),

    #[error("unrecognized prediction type: {0}")]
    UnknownType(String),

    #[error("invalid match date {0:?} (expected RFC 3339 or YYYY-MM-DDTHH:MM)")]
    InvalidMatchDate(String),

    #[error("cannot settle {id}: result is already {from}")]
    AlreadySettled { id: String, from: Outcome },

    #[error("cannot settle a prediction back to pending")]
    NotASettlement,
}

pub fn ensure_admin(viewer: &ViewerContext) -> Result<(), AdminError> {
    if viewer.is_admin() {
        Ok(())
    } else {
        Err(AdminError::NotAdmin)
    }
}

/// Form input for a new prediction, as an admin writes it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PredictionDraft {
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub prediction_type: Option<String>,
    pub prediction: String,
    pub confidence_score: Option<i64>,
    pub match_date: String,
    pub is_premium: bool,
    pub reasoning: Option<String>,
    pub match_id: Option<String>,
    pub odds: Odds,
}

/// Insert payload for the `predictions` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<String>,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub prediction_type: PredictionType,
    pub prediction: String,
    pub confidence_score: Option<Confidence>,
    pub odds: Odds,
    pub is_premium: bool,
    pub match_date: DateTime<Utc>,
    pub result: Outcome,
    pub reasoning: Option<String>,
    pub created_by: Option<String>,
}

fn required(value: &str, field: &'static str) -> Result<String, AdminError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(AdminError::MissingField(field));
    }
    Ok(v.to_string())
}

/// Accepts RFC 3339, or a bare `YYYY-MM-DDTHH:MM[:SS]` read in the admin's offset.
pub fn parse_match_date(raw: &str, local: FixedOffset) -> Result<DateTime<Utc>, AdminError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AdminError::MissingField("match date"));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .and_then(|naive| naive.and_local_timezone(local).single())
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| AdminError::InvalidMatchDate(raw.to_string()))
}

impl PredictionDraft {
    pub fn validate(&self, viewer: &ViewerContext, local: FixedOffset) -> Result<NewPrediction, AdminError> {
        ensure_admin(viewer)?;

        let prediction_type = match self.prediction_type.as_deref() {
            None => PredictionType::Single,
            Some(t) => t.parse().map_err(|_| AdminError::UnknownType(t.to_string()))?,
        };
        let score = self.confidence_score.unwrap_or(DEFAULT_CONFIDENCE);
        let confidence = Confidence::new(score).ok_or(AdminError::ConfidenceOutOfRange(score))?;

        Ok(NewPrediction {
            match_id: self.match_id.clone().filter(|m| !m.trim().is_empty()),
            league: required(&self.league, "league")?,
            home_team: required(&self.home_team, "home team")?,
            away_team: required(&self.away_team, "away team")?,
            prediction_type,
            prediction: required(&self.prediction, "prediction")?,
            confidence_score: Some(confidence),
            odds: self.odds.clone(),
            is_premium: self.is_premium,
            match_date: parse_match_date(&self.match_date, local)?,
            result: Outcome::Pending,
            reasoning: self
                .reasoning
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            created_by: viewer.user_id().map(str::to_string),
        })
    }
}

/// Partial update for an existing prediction. Unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PredictionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<Confidence>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odds: Option<Odds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_premium: Option<bool>,
}

impl PredictionUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply(&self, p: &mut Prediction) {
        if let Some(r) = self.result {
            p.result = r;
        }
        if let Some(ref text) = self.prediction {
            p.prediction = text.clone();
        }
        if let Some(c) = self.confidence_score {
            p.confidence_score = Some(c);
        }
        if let Some(ref r) = self.reasoning {
            p.reasoning = Some(r.clone());
        }
        if let Some(ref o) = self.odds {
            p.odds = o.clone();
        }
        if let Some(flag) = self.is_premium {
            p.is_premium = flag;
        }
    }
}

/// Build the update that settles `prediction`. Results only move forward
/// from pending.
pub fn settle(
    viewer: &ViewerContext,
    prediction: &Prediction,
    outcome: Outcome,
) -> Result<PredictionUpdate, AdminError> {
    ensure_admin(viewer)?;
    if !outcome.is_settled() {
        return Err(AdminError::NotASettlement);
    }
    if !prediction.result.can_transition_to(outcome) {
        return Err(AdminError::AlreadySettled {
            id: prediction.id.clone(),
            from: prediction.result,
        });
    }
    Ok(PredictionUpdate {
        result: Some(outcome),
        ..Default::default()
    })
}
