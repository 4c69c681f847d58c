use crate::engine::access::{Member, SubscriptionTier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row of the `profiles` table.
#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub subscription_plan: SubscriptionTier,
    #[serde(default)]
    pub subscription_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_admin: bool,
}

impl Profile {
    /// A premium plan past its expiry counts as free, even if the stored
    /// plan has not been downgraded yet.
    pub fn effective_tier(&self, now: DateTime<Utc>) -> SubscriptionTier {
        match (self.subscription_plan, self.subscription_expires_at) {
            (SubscriptionTier::Premium, Some(expires)) if expires <= now => SubscriptionTier::Free,
            (plan, _) => plan,
        }
    }

    pub fn into_member(self, now: DateTime<Utc>) -> Member {
        let tier = self.effective_tier(now);
        Member {
            user_id: self.id,
            display_name: self.full_name.filter(|n| !n.trim().is_empty()),
            tier,
            is_admin: self.is_admin,
        }
    }
}

/// `POST /auth/v1/token?grant_type=password` body.
#[derive(Debug, Serialize)]
pub struct PasswordGrant<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    pub user: AuthUser,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// The parts of the access-token payload we read.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
}

impl Claims {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

/// PostgREST / GoTrue error body. Either shape may show up.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default, alias = "msg", alias = "error_description")]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<serde_json::Value>,
}
