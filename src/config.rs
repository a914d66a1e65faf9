//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and resolves
//! the update delivery mode.

use crate::inventory::cache::DEFAULT_FRESHNESS_SECS;
use crate::inventory::source::{
    DEFAULT_DOWNLOAD_TIMEOUT_SECS, DEFAULT_RESOLVER_URL, DEFAULT_RESOLVE_TIMEOUT_SECS,
};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Port the webhook listener binds to when `PORT` is not set
pub const DEFAULT_WEBHOOK_PORT: u16 = 10000;

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,
    /// Public Yandex Disk link to the spreadsheet
    pub spreadsheet_url: String,

    /// Endpoint that turns a public link into a download URL
    #[serde(default = "default_resolver_url")]
    pub resolver_url: String,
    /// Freshness window of the workbook cache
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Timeout of the link resolution call
    #[serde(default = "default_resolve_timeout_secs")]
    pub resolve_timeout_secs: u64,
    /// Timeout of the file download call
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,

    /// Set by the hosting platform; its presence selects webhook delivery
    pub render: Option<String>,
    /// Webhook listener port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public hostname advertised to Telegram in webhook mode
    pub render_external_hostname: Option<String>,
}

fn default_resolver_url() -> String {
    DEFAULT_RESOLVER_URL.to_string()
}

const fn default_cache_ttl_secs() -> u64 {
    DEFAULT_FRESHNESS_SECS
}

const fn default_resolve_timeout_secs() -> u64 {
    DEFAULT_RESOLVE_TIMEOUT_SECS
}

const fn default_download_timeout_secs() -> u64 {
    DEFAULT_DOWNLOAD_TIMEOUT_SECS
}

const fn default_port() -> u16 {
    DEFAULT_WEBHOOK_PORT
}

/// How updates reach the bot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Long polling of `getUpdates`
    Polling,
    /// Telegram pushes updates to an HTTP listener
    Webhook {
        /// Public hostname advertised to Telegram
        host: String,
        /// Local port to bind on all interfaces
        port: u16,
        /// URL path without the leading slash
        path: String,
    },
}

impl DeliveryMode {
    /// Public URL registered with Telegram, if in webhook mode.
    #[must_use]
    pub fn webhook_url(&self) -> Option<String> {
        match self {
            Self::Polling => None,
            Self::Webhook { host, path, .. } => Some(format!("https://{host}/{path}")),
        }
    }
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use stock_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or a required key is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg. `APP__CACHE_TTL_SECS=60 ./target/stock-bot`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Bare variables; UPPER_SNAKE_CASE maps to snake_case keys
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }

    /// Settings with the two required values and defaults for everything else.
    #[must_use]
    pub fn with_required(telegram_token: impl Into<String>, spreadsheet_url: impl Into<String>) -> Self {
        Self {
            telegram_token: telegram_token.into(),
            spreadsheet_url: spreadsheet_url.into(),
            resolver_url: default_resolver_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            resolve_timeout_secs: default_resolve_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
            render: None,
            port: default_port(),
            render_external_hostname: None,
        }
    }

    /// Freshness window of the workbook cache.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Timeout of the link resolution call.
    #[must_use]
    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Timeout of the file download call.
    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    /// Resolves the delivery mode once at startup.
    ///
    /// Webhook mode is selected by the presence of `RENDER`; the bot token
    /// doubles as the secret URL path.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if webhook mode is selected without a public hostname.
    pub fn delivery_mode(&self) -> Result<DeliveryMode, ConfigError> {
        if self.render.is_none() {
            return Ok(DeliveryMode::Polling);
        }

        let host = self
            .render_external_hostname
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or(ConfigError::NotFound("render_external_hostname".to_string()))?;

        Ok(DeliveryMode::Webhook {
            host: host.to_string(),
            port: self.port,
            path: self.telegram_token.clone(),
        })
    }
}
