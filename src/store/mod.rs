pub mod memory;

use crate::engine::admin::{NewPrediction, PredictionUpdate};
use crate::model::{Prediction, PredictionType};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

/// Read side of the `predictions` table. Rows always come back ascending
/// by `match_date`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionQuery {
    pub prediction_type: Option<PredictionType>,
    pub is_premium: Option<bool>,
    pub limit: Option<usize>,
    pub match_from: Option<DateTime<Utc>>,
    pub match_until: Option<DateTime<Utc>>,
}

impl PredictionQuery {
    pub fn matches(&self, p: &Prediction) -> bool {
        self.prediction_type.map_or(true, |t| t == p.prediction_type)
            && self.is_premium.map_or(true, |flag| flag == p.is_premium)
            && self.match_from.map_or(true, |from| p.match_date >= from)
            && self.match_until.map_or(true, |until| p.match_date < until)
    }

    /// PostgREST query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("select".to_string(), "*".to_string()),
            ("order".to_string(), "match_date.asc".to_string()),
        ];
        if let Some(t) = self.prediction_type {
            params.push(("prediction_type".to_string(), format!("eq.{}", t)));
        }
        if let Some(flag) = self.is_premium {
            params.push(("is_premium".to_string(), format!("eq.{}", flag)));
        }
        if let Some(from) = self.match_from {
            params.push(("match_date".to_string(), format!("gte.{}", timestamp(from))));
        }
        if let Some(until) = self.match_until {
            params.push(("match_date".to_string(), format!("lt.{}", timestamp(until))));
        }
        if let Some(n) = self.limit {
            params.push(("limit".to_string(), n.to_string()));
        }
        params
    }
}

fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
pub trait PredictionStore: Send + Sync {
    async fn list(&self, query: &PredictionQuery) -> Result<Vec<Prediction>>;
    async fn insert(&self, new: &NewPrediction) -> Result<Prediction>;

    /// Apply `changes` only if the row's result is still pending, as one
    /// conditional write. `None` when no pending row with that id exists.
    async fn update_pending(&self, id: &str, changes: &PredictionUpdate) -> Result<Option<Prediction>>;

    async fn get(&self, id: &str) -> Result<Option<Prediction>> {
        let rows = self.list(&PredictionQuery::default()).await?;
        Ok(rows.into_iter().find(|p| p.id == id))
    }
}
