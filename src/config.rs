//! Configuration loading.
//!
//! Settings come from a TOML file (default `./config/tfind.toml`). Every
//! section is optional, and a missing file yields [`Config::default`] so the
//! proxy can run with no configuration at all. Secrets never live in the
//! file: the upstream credential is read from `META_ACCESS_TOKEN`.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [upstream]
//! base_url = "https://graph.facebook.com"
//! api_version = "v20.0"
//! locale = "en_US"
//! timeout_secs = 15
//!
//! [lead]
//! webhook_url = "https://script.google.com/macros/s/…/exec"
//! source = "portfolio-site"
//!
//! [search]
//! default_country = "IN"
//! default_limit = 25
//! debounce_ms = 250
//! blur_close_ms = 120
//! ```
//!
//! # Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `META_ACCESS_TOKEN` | Upstream credential (required for real results) |
//! | `META_API_VERSION` | Overrides `upstream.api_version` |
//! | `LEAD_WEBHOOK_URL` | Overrides `lead.webhook_url` |
//! | `GAS_WEBAPP_URL`, `NEXT_PUBLIC_GAS_WEBAPP_URL` | Older names for `LEAD_WEBHOOK_URL`, in that order |

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use targeting_finder_core::lead::DEFAULT_SOURCE;
use targeting_finder_core::models::normalize_country;
use targeting_finder_core::request::{MAX_LIMIT, MIN_LIMIT};

pub const ENV_ACCESS_TOKEN: &str = "META_ACCESS_TOKEN";
pub const ENV_API_VERSION: &str = "META_API_VERSION";
pub const ENV_WEBHOOK_URL: &str = "LEAD_WEBHOOK_URL";
/// Older names for the webhook URL, checked in order after [`ENV_WEBHOOK_URL`].
pub const ENV_WEBHOOK_URL_ALIASES: [&str; 2] = ["GAS_WEBAPP_URL", "NEXT_PUBLIC_GAS_WEBAPP_URL"];

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub lead: LeadConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Filled from `META_ACCESS_TOKEN`; never read from the file.
    #[serde(skip)]
    pub access_token: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            locale: default_locale(),
            timeout_secs: default_timeout_secs(),
            access_token: None,
        }
    }
}

fn default_base_url() -> String {
    "https://graph.facebook.com".to_string()
}
fn default_api_version() -> String {
    "v20.0".to_string()
}
fn default_locale() -> String {
    "en_US".to_string()
}
fn default_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct LeadConfig {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            source: default_source(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_country")]
    pub default_country: String,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_blur_close_ms")]
    pub blur_close_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_country: default_country(),
            default_limit: default_limit(),
            debounce_ms: default_debounce_ms(),
            blur_close_ms: default_blur_close_ms(),
        }
    }
}

fn default_country() -> String {
    "IN".to_string()
}
fn default_limit() -> u32 {
    25
}
fn default_debounce_ms() -> u64 {
    250
}
fn default_blur_close_ms() -> u64 {
    120
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn blur_close(&self) -> Duration {
        Duration::from_millis(self.blur_close_ms)
    }
}

impl Config {
    /// Apply environment overrides (credential, API version, webhook URL).
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(token) = non_empty(ENV_ACCESS_TOKEN) {
            self.upstream.access_token = Some(token);
        }
        if let Some(version) = non_empty(ENV_API_VERSION) {
            self.upstream.api_version = version;
        }
        let webhook = std::iter::once(ENV_WEBHOOK_URL)
            .chain(ENV_WEBHOOK_URL_ALIASES)
            .find_map(|key| non_empty(key));
        if let Some(url) = webhook {
            self.lead.webhook_url = Some(url);
        }
    }
}

/// Parse and validate a config from TOML text (no environment applied).
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if !(MIN_LIMIT..=MAX_LIMIT).contains(&config.search.default_limit) {
        anyhow::bail!(
            "search.default_limit must be in [{}, {}]",
            MIN_LIMIT,
            MAX_LIMIT
        );
    }

    normalize_country(&config.search.default_country)
        .with_context(|| "search.default_country must be ALL or a two-letter code")?;

    if config.upstream.api_version.trim().is_empty() {
        anyhow::bail!("upstream.api_version must not be empty");
    }

    reqwest::Url::parse(&config.upstream.base_url)
        .with_context(|| format!("upstream.base_url is not a URL: {}", config.upstream.base_url))?;

    if let Some(url) = &config.lead.webhook_url {
        reqwest::Url::parse(url)
            .with_context(|| format!("lead.webhook_url is not a URL: {}", url))?;
    }

    if config.upstream.timeout_secs == 0 {
        anyhow::bail!("upstream.timeout_secs must be > 0");
    }

    Ok(())
}

/// Load the config file at `path` and apply environment overrides.
///
/// A missing file is not an error: defaults are used. A file that exists
/// but fails to parse or validate is.
pub fn load_config(path: &Path) -> Result<Config> {
    let mut config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        parse_config(&content)?
    } else {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        Config::default()
    };
    config.apply_env();
    validate(&config)?;
    Ok(config)
}
