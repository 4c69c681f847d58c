use super::auth::SupabaseAuth;
use super::types::*;
use crate::config::SupabaseConfig;
use crate::engine::access::ViewerContext;
use crate::engine::admin::{NewPrediction, PredictionUpdate};
use crate::model::Prediction;
use crate::store::{PredictionQuery, PredictionStore};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;

pub struct SupabaseRest {
    client: Client,
    auth: Arc<SupabaseAuth>,
    base_url: String,
    predictions_table: String,
    profiles_table: String,
}

impl SupabaseRest {
    pub fn new(auth: Arc<SupabaseAuth>, config: &SupabaseConfig) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            auth,
            base_url: config.url.trim_end_matches('/').to_string(),
            predictions_table: config.predictions_table.clone(),
            profiles_table: config.profiles_table.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authed(&self, mut req: RequestBuilder) -> RequestBuilder {
        for (k, v) in self.auth.headers() {
            req = req.header(k, v);
        }
        req
    }

    /// Sign in with email + password. Returns the new session; the caller
    /// decides where to keep the token.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let resp = self
            .client
            .post(&url)
            .header("apikey", self.auth.anon_key())
            .json(&PasswordGrant { email, password })
            .send()
            .await
            .context("sign-in request failed")?;
        let resp = check(resp, "sign-in").await?;
        resp.json().await.context("failed to parse sign-in response")
    }

    /// The user behind the current session token. `None` when the server
    /// rejects the token.
    pub async fn fetch_user(&self) -> Result<Option<AuthUser>> {
        let url = format!("{}/auth/v1/user", self.base_url);
        let resp = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("GET user failed")?;
        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        let resp = check(resp, "GET user").await?;
        let user = resp.json().await.context("failed to parse user response")?;
        Ok(Some(user))
    }

    pub async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let resp = self
            .authed(self.client.get(self.table_url(&self.profiles_table)))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", user_id))])
            .send()
            .await
            .context("GET profile failed")?;
        let resp = check(resp, "GET profile").await?;
        let rows: Vec<Profile> = resp.json().await.context("failed to parse profile response")?;
        Ok(rows.into_iter().next())
    }

    /// Work out who is looking. No token, an expired token, or a token the
    /// server rejects all mean an anonymous viewer.
    pub async fn resolve_viewer(&self, now: DateTime<Utc>) -> Result<ViewerContext> {
        let claims = match self.auth.claims() {
            Ok(Some(claims)) => claims,
            Ok(None) => return Ok(ViewerContext::anonymous()),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "unreadable session token, continuing anonymously");
                return Ok(ViewerContext::anonymous());
            }
        };
        if claims.is_expired(now) {
            tracing::warn!(user = %claims.sub, "session token expired, continuing anonymously");
            return Ok(ViewerContext::anonymous());
        }
        let Some(user) = self.fetch_user().await? else {
            tracing::warn!(user = %claims.sub, "session token rejected, continuing anonymously");
            return Ok(ViewerContext::anonymous());
        };

        let member = match self.fetch_profile(&user.id).await? {
            Some(profile) => profile.into_member(now),
            None => {
                tracing::warn!(user = %user.id, "no profile row, treating as free member");
                crate::engine::access::Member {
                    user_id: user.id,
                    display_name: None,
                    tier: Default::default(),
                    is_admin: false,
                }
            }
        };
        tracing::info!(user = %member.user_id, tier = ?member.tier, admin = member.is_admin, "viewer resolved");
        Ok(ViewerContext::member(member))
    }
}

/// PATCH filter that only matches the row while it is still pending.
fn pending_row_filter(id: &str) -> [(&'static str, String); 2] {
    [("id", format!("eq.{}", id)), ("result", "eq.pending".to_string())]
}

/// Bail on a non-success status, keeping the server's message.
async fn check(resp: Response, what: &str) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or(body);
    anyhow::bail!("{} failed ({}): {}", what, status, message);
}

#[async_trait]
impl PredictionStore for SupabaseRest {
    async fn list(&self, query: &PredictionQuery) -> Result<Vec<Prediction>> {
        let resp = self
            .authed(self.client.get(self.table_url(&self.predictions_table)))
            .query(&query.to_params())
            .send()
            .await
            .context("GET predictions failed")?;
        let resp = check(resp, "GET predictions").await?;
        let rows: Vec<Prediction> = resp.json().await.context("failed to parse predictions response")?;
        tracing::debug!(count = rows.len(), ?query, "fetched predictions");
        Ok(rows)
    }

    async fn insert(&self, new: &NewPrediction) -> Result<Prediction> {
        let resp = self
            .authed(self.client.post(self.table_url(&self.predictions_table)))
            .header("Prefer", "return=representation")
            .json(new)
            .send()
            .await
            .context("insert prediction request failed")?;
        let resp = check(resp, "insert prediction").await?;
        let mut rows: Vec<Prediction> = resp.json().await.context("failed to parse insert response")?;
        rows.pop().context("insert returned no row (check row-level policies)")
    }

    async fn update_pending(&self, id: &str, changes: &PredictionUpdate) -> Result<Option<Prediction>> {
        let resp = self
            .authed(self.client.patch(self.table_url(&self.predictions_table)))
            .query(&pending_row_filter(id))
            .header("Prefer", "return=representation")
            .json(changes)
            .send()
            .await
            .context("update prediction request failed")?;
        let resp = check(resp, "update prediction").await?;
        // An empty representation means no pending row matched
        let mut rows: Vec<Prediction> = resp.json().await.context("failed to parse update response")?;
        Ok(rows.pop())
    }

    async fn get(&self, id: &str) -> Result<Option<Prediction>> {
        let resp = self
            .authed(self.client.get(self.table_url(&self.predictions_table)))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))])
            .send()
            .await
            .context("GET prediction failed")?;
        let resp = check(resp, "GET prediction").await?;
        let rows: Vec<Prediction> = resp.json().await.context("failed to parse prediction response")?;
        Ok(rows.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest(token: Option<&str>) -> SupabaseRest {
        let config: SupabaseConfig = toml::from_str("url = \"http://127.0.0.1:9\"").unwrap();
        let auth = Arc::new(SupabaseAuth::new("anon".to_string(), token.map(str::to_string)));
        SupabaseRest::new(auth, &config)
    }

    #[tokio::test]
    async fn test_malformed_token_resolves_anonymous() {
        let viewer = rest(Some("not-a-jwt")).resolve_viewer(Utc::now()).await.unwrap();
        assert!(!viewer.is_authenticated());
    }

    #[tokio::test]
    async fn test_no_token_resolves_anonymous() {
        let viewer = rest(None).resolve_viewer(Utc::now()).await.unwrap();
        assert!(!viewer.is_authenticated());
    }

    #[test]
    fn test_settle_patch_only_matches_pending_rows() {
        let filter = pending_row_filter("p-9");
        assert!(filter.contains(&("id", "eq.p-9".to_string())));
        assert!(filter.contains(&("result", "eq.pending".to_string())));
    }
}
