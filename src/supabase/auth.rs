use super::types::Claims;
use anyhow::{Context, Result};
use base64::Engine as _;

/// Project key plus the optional session token of the signed-in user.
pub struct SupabaseAuth {
    anon_key: String,
    access_token: Option<String>,
}

impl SupabaseAuth {
    pub fn new(anon_key: String, access_token: Option<String>) -> Self {
        Self {
            anon_key,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub fn has_session(&self) -> bool {
        self.access_token.is_some()
    }

    /// Headers for a PostgREST / GoTrue request. Without a session the
    /// anon key doubles as the bearer token, so row-level policies see an
    /// anonymous caller.
    pub fn headers(&self) -> Vec<(String, String)> {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        vec![
            ("apikey".to_string(), self.anon_key.clone()),
            ("Authorization".to_string(), format!("Bearer {}", bearer)),
        ]
    }

    /// Claims of the session token, if there is one. The signature is not
    /// checked here; the server does that on every request.
    pub fn claims(&self) -> Result<Option<Claims>> {
        self.access_token.as_deref().map(decode_claims).transpose()
    }
}

/// Decode the payload segment of a JWT.
pub fn decode_claims(token: &str) -> Result<Claims> {
    let payload = token
        .split('.')
        .nth(1)
        .context("access token is not a JWT")?;
    // Some issuers pad, some don't
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .context("Failed to decode access token payload")?;
    serde_json::from_slice(&bytes).context("Failed to parse access token claims")
}
