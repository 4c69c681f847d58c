use crate::engine::listing::{DateWindow, TypeSelector};
use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::Deserialize;
use std::io::{self, Write};
use std::path::Path;

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SupabaseConfig {
    pub url: String,
    #[serde(default = "default_predictions_table")]
    pub predictions_table: String,
    #[serde(default = "default_profiles_table")]
    pub profiles_table: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_predictions_table() -> String {
    "predictions".to_string()
}

fn default_profiles_table() -> String {
    "profiles".to_string()
}

fn default_request_timeout() -> u64 { 10_000 }

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_type")]
    pub default_type: String,
    #[serde(default = "default_date")]
    pub default_date: String,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_admin_rows")]
    pub admin_table_rows: usize,
}

fn default_type() -> String {
    "all".to_string()
}

fn default_date() -> String {
    "today".to_string()
}

fn default_recent_limit() -> usize { 5 }
fn default_admin_rows() -> usize { 10 }

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            default_type: default_type(),
            default_date: default_date(),
            recent_limit: default_recent_limit(),
            admin_table_rows: default_admin_rows(),
        }
    }
}

impl ListingConfig {
    pub fn type_selector(&self) -> Result<TypeSelector> {
        TypeSelector::parse(&self.default_type)
            .with_context(|| format!("listing.default_type: unknown type {:?}", self.default_type))
    }

    pub fn date_window(&self) -> Result<DateWindow> {
        DateWindow::parse(&self.default_date)
            .with_context(|| format!("listing.default_date: unknown window {:?}", self.default_date))
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplayConfig {
    /// Fixed UTC offset for calendar-day filters. Unset means the
    /// machine's local offset.
    pub utc_offset_minutes: Option<i32>,
}

impl DisplayConfig {
    pub fn offset_at(&self, instant: DateTime<Utc>) -> Result<FixedOffset> {
        match self.utc_offset_minutes {
            Some(m) => FixedOffset::east_opt(m * 60)
                .with_context(|| format!("display.utc_offset_minutes out of range: {}", m)),
            None => Ok(*instant.with_timezone(&Local).offset()),
        }
    }

    /// The current instant in the viewer's offset.
    pub fn now(&self) -> Result<DateTime<FixedOffset>> {
        let now = Utc::now();
        Ok(now.with_timezone(&self.offset_at(now)?))
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.supabase.url.trim().is_empty() {
            anyhow::bail!("supabase.url cannot be empty");
        }
        self.listing.type_selector()?;
        self.listing.date_window()?;
        self.display.offset_at(Utc::now())?;
        Ok(())
    }

    /// Load .env file into process environment. Real env vars take precedence.
    pub fn load_env_file() {
        let path = Path::new(ENV_FILE);
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return,
        };
        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);
        for line in content.lines() {
            let line = line.trim().trim_matches('\r');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim().trim_matches('"').trim_matches('\'');
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
        }
    }

    /// Project URL may be overridden from the environment.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            if !url.trim().is_empty() {
                self.supabase.url = sanitize_key(&url);
            }
        }
    }

    /// The project's public anon key, from the environment or prompted.
    /// Prompted values are saved to .env for future runs.
    pub fn supabase_anon_key() -> Result<String> {
        match std::env::var("SUPABASE_ANON_KEY") {
            Ok(key) if !key.is_empty() => Ok(sanitize_key(&key)),
            _ => {
                let key = prompt("Supabase anon key")?;
                save_env_var("SUPABASE_ANON_KEY", &key);
                Ok(key)
            }
        }
    }

    /// Session token from a previous `login`, if any.
    pub fn supabase_access_token() -> Option<String> {
        std::env::var("SUPABASE_ACCESS_TOKEN")
            .ok()
            .map(|t| sanitize_key(&t))
            .filter(|t| !t.is_empty())
    }

    pub fn save_access_token(token: &str) {
        save_env_var("SUPABASE_ACCESS_TOKEN", token);
    }
}

pub fn prompt(label: &str) -> Result<String> {
    print!("  {} > ", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let value = input.trim().to_string();
    if value.is_empty() {
        anyhow::bail!("{} cannot be empty", label);
    }
    Ok(value)
}

/// Strip carriage returns, BOM, and other invisible chars from a key value.
fn sanitize_key(raw: &str) -> String {
    raw.replace(['\r', '\u{feff}', '\u{200b}'], "")
        .trim()
        .to_string()
}

/// Set KEY=VALUE in .env (replacing an earlier line for KEY) and in the
/// current process.
fn save_env_var(key: &str, value: &str) {
    std::env::set_var(key, value);
    let path = Path::new(ENV_FILE);
    let existing = std::fs::read_to_string(path).unwrap_or_default();
    let prefix = format!("{}=", key);
    let mut contents: String = existing
        .lines()
        .filter(|line| !line.trim_start().starts_with(&prefix))
        .map(|line| format!("{}\n", line))
        .collect();
    contents.push_str(&format!("{}={}\n", key, value));
    if let Err(e) = std::fs::write(path, contents) {
        tracing::warn!(error = %e, "failed to save {} to .env", key);
    }
}
