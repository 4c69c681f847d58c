use super::{PredictionQuery, PredictionStore};
use crate::engine::admin::{NewPrediction, PredictionUpdate};
use crate::model::{Outcome, Prediction};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::Mutex;

/// In-process store used for `--offline` runs and tests.
pub struct MemoryStore {
    rows: Mutex<Vec<Prediction>>,
    next_id: Mutex<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryStore {
    pub fn new(mut rows: Vec<Prediction>) -> Self {
        rows.sort_by_key(|p| p.match_date);
        let next_id = rows.len() as u64 + 1;
        Self {
            rows: Mutex::new(rows),
            next_id: Mutex::new(next_id),
        }
    }

    /// Load a JSON array of prediction rows, as exported from the table.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read predictions file: {}", path.display()))?;
        let rows: Vec<Prediction> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse predictions file: {}", path.display()))?;
        tracing::info!(path = %path.display(), count = rows.len(), "loaded offline predictions");
        Ok(Self::new(rows))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock_rows()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lock_rows(&self) -> Result<std::sync::MutexGuard<'_, Vec<Prediction>>> {
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("prediction store lock poisoned"))
    }
}

#[async_trait]
impl PredictionStore for MemoryStore {
    async fn list(&self, query: &PredictionQuery) -> Result<Vec<Prediction>> {
        let rows = self.lock_rows()?;
        let matching = rows.iter().filter(|p| query.matches(p)).cloned();
        Ok(match query.limit {
            Some(n) => matching.take(n).collect(),
            None => matching.collect(),
        })
    }

    async fn insert(&self, new: &NewPrediction) -> Result<Prediction> {
        let id = {
            let mut next = self
                .next_id
                .lock()
                .map_err(|_| anyhow::anyhow!("id counter lock poisoned"))?;
            let id = *next;
            *next += 1;
            format!("local-{}", id)
        };
        let now = Utc::now();
        let row = Prediction {
            id,
            match_id: new.match_id.clone(),
            league: new.league.clone(),
            home_team: new.home_team.clone(),
            away_team: new.away_team.clone(),
            prediction_type: new.prediction_type,
            prediction: new.prediction.clone(),
            confidence_score: new.confidence_score,
            odds: new.odds.clone(),
            is_premium: new.is_premium,
            match_date: new.match_date,
            result: new.result,
            reasoning: new.reasoning.clone(),
            created_by: new.created_by.clone(),
            created_at: now,
            updated_at: now,
        };

        let mut rows = self.lock_rows()?;
        let pos = rows.partition_point(|p| p.match_date <= row.match_date);
        rows.insert(pos, row.clone());
        Ok(row)
    }

    async fn update_pending(&self, id: &str, changes: &PredictionUpdate) -> Result<Option<Prediction>> {
        let mut rows = self.lock_rows()?;
        let Some(row) = rows
            .iter_mut()
            .find(|p| p.id == id && p.result == Outcome::Pending)
        else {
            return Ok(None);
        };
        changes.apply(row);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn get(&self, id: &str) -> Result<Option<Prediction>> {
        Ok(self.lock_rows()?.iter().find(|p| p.id == id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{fixtures, PredictionType};
    use chrono::TimeZone;

    fn settle_to(outcome: Outcome) -> PredictionUpdate {
        PredictionUpdate {
            result: Some(outcome),
            ..Default::default()
        }
    }

    fn store() -> MemoryStore {
        let kickoff = Utc.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        MemoryStore::new(vec![fixtures::prediction("p-1", PredictionType::Single, kickoff)])
    }

    #[tokio::test]
    async fn test_update_pending_applies_once() {
        let store = store();
        let row = store.update_pending("p-1", &settle_to(Outcome::Won)).await.unwrap();
        assert_eq!(row.map(|p| p.result), Some(Outcome::Won));

        // A second settlement from a stale read must not overwrite the first
        assert!(store.update_pending("p-1", &settle_to(Outcome::Lost)).await.unwrap().is_none());
        assert_eq!(store.get("p-1").await.unwrap().unwrap().result, Outcome::Won);
    }

    #[tokio::test]
    async fn test_update_pending_unknown_id() {
        let store = store();
        assert!(store.update_pending("nope", &settle_to(Outcome::Won)).await.unwrap().is_none());
    }

    #[test]
    fn test_len_reports_poisoned_lock() {
        let store = std::sync::Arc::new(store());
        assert_eq!(store.len().unwrap(), 1);
        assert!(!store.is_empty().unwrap());

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.rows.lock().unwrap();
            panic!("poison the row lock");
        })
        .join();
        assert!(store.len().is_err());
        assert!(store.is_empty().is_err());
    }
}
