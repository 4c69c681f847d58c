//! Fetch-and-narrow operations behind each view. Every call is one request
//! and/or one write against the store; errors are passed up untouched so the
//! view can show them.

use crate::engine::access::ViewerContext;
use crate::engine::admin::{self, AdminError, PredictionDraft};
use crate::engine::listing::{self, TypeSelector};
use crate::engine::stats::{self, TrackRecord};
use crate::model::{Outcome, Prediction};
use crate::store::{PredictionQuery, PredictionStore};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    pub today: Vec<Prediction>,
    pub recent: Vec<Prediction>,
    pub record: TrackRecord,
}

pub struct TipService {
    store: Arc<dyn PredictionStore>,
    viewer: ViewerContext,
}

impl TipService {
    pub fn new(store: Arc<dyn PredictionStore>, viewer: ViewerContext) -> Self {
        Self { store, viewer }
    }

    pub fn viewer(&self) -> &ViewerContext {
        &self.viewer
    }

    /// Rows for the predictions page. Type narrowing and the premium flag
    /// go to the store; the date window is applied by the caller.
    pub async fn listing(&self, types: TypeSelector, limit: Option<usize>) -> Result<Vec<Prediction>> {
        let query = PredictionQuery {
            prediction_type: types.as_type(),
            is_premium: self.viewer.premium_filter(),
            limit,
            ..Default::default()
        };
        self.store.list(&query).await
    }

    /// The `list` command: string selectors narrowed after the fetch, then
    /// capped at `limit`. Unknown selector names yield nothing.
    pub async fn named_listing(
        &self,
        type_name: &str,
        window_name: &str,
        limit: Option<usize>,
        now: DateTime<FixedOffset>,
    ) -> Result<Vec<Prediction>> {
        let types = TypeSelector::parse(type_name).unwrap_or_default();
        let rows = self.listing(types, None).await?;
        let visible = listing::filter_named(&rows, type_name, window_name, now);
        Ok(visible
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    pub async fn dashboard(&self, now: DateTime<FixedOffset>, recent_limit: usize) -> Result<Dashboard> {
        let (from, until) = listing::local_day_bounds(now).context("local midnight is ambiguous")?;
        let today = self
            .store
            .list(&PredictionQuery {
                match_from: Some(from),
                match_until: Some(until),
                ..Default::default()
            })
            .await?;
        let recent = self.listing(TypeSelector::All, Some(recent_limit)).await?;
        let record = self.track_record().await?;
        Ok(Dashboard { today, recent, record })
    }

    /// Results are not premium content, so the record covers every row the
    /// store lets us read.
    pub async fn track_record(&self) -> Result<TrackRecord> {
        let all = self.store.list(&PredictionQuery::default()).await?;
        Ok(stats::track_record(&all))
    }

    pub async fn admin_rows(&self, rows: usize) -> Result<Vec<Prediction>> {
        admin::ensure_admin(&self.viewer)?;
        self.store
            .list(&PredictionQuery {
                limit: Some(rows),
                ..Default::default()
            })
            .await
    }

    pub async fn add(&self, draft: &PredictionDraft, local: FixedOffset) -> Result<Prediction> {
        let new = draft.validate(&self.viewer, local)?;
        let row = self.store.insert(&new).await?;
        tracing::info!(id = %row.id, matchup = %row.matchup(), premium = row.is_premium, "prediction added");
        Ok(row)
    }

    pub async fn settle(&self, id: &str, outcome: Outcome) -> Result<Prediction> {
        admin::ensure_admin(&self.viewer)?;
        let current = self
            .store
            .get(id)
            .await?
            .with_context(|| format!("prediction {} not found", id))?;
        let update = admin::settle(&self.viewer, &current, outcome)?;
        let Some(row) = self.store.update_pending(id, &update).await? else {
            // Settled by someone else between the read and the write
            let from = self.store.get(id).await?.map_or(current.result, |p| p.result);
            tracing::warn!(id, %from, "settlement lost the race, row already settled");
            return Err(AdminError::AlreadySettled { id: id.to_string(), from }.into());
        };
        tracing::info!(id = %row.id, result = %row.result, "prediction settled");
        Ok(row)
    }
}
