//! # Configuration
//!
//! `AppConfig` is assembled in three layers, later ones winning:
//!
//! 1. an optional TOML file (`--config fundflow.toml`)
//! 2. `FUNDFLOW_*` environment variables
//! 3. command line flags
//!
//! Every section has defaults, so an empty file is a valid configuration.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [ledger]
//! fixture = "demos/fixture.json"
//!
//! [explorer]
//! page_limit = 100
//! max_concurrent_fetches = 8
//! attribution = "full_net"
//!
//! [explorer.retry]
//! max_attempts = 5      # 0 retries forever
//! base_delay_ms = 200
//! max_delay_ms = 5000
//!
//! [layout]
//! distance = 450.0
//! tick_interval_ms = 16
//! refit_interval_ms = 2000
//!
//! [hooks]
//! open_url_base = "https://explorer.nervos.org/address/"
//! ```

use crate::explorer::{ExplorerConfig, RetryPolicy};
use crate::session::DEFAULT_OPEN_URL_BASE;
use fundflow_core::primitives::REFIT_INTERVAL_MS;
use fundflow_core::{FlowAttribution, FlowError, LayoutConfig, LayoutDistance, PageLimit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FUNDFLOW_";

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Tuning(#[from] FlowError),
}

fn invalid(key: &str, value: impl ToString, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON fixture served by the fixture ledger.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per request. `0` retries forever.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts.unwrap_or(0),
            base_delay_ms: policy.base_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.base_delay_ms);
        let max_delay = Duration::from_millis(self.max_delay_ms);
        match self.max_attempts {
            0 => RetryPolicy::unbounded(base_delay, max_delay),
            max => RetryPolicy {
                max_attempts: Some(max),
                base_delay,
                max_delay,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerSettings {
    pub page_limit: PageLimit,
    pub max_concurrent_fetches: usize,
    pub attribution: FlowAttribution,
    pub retry: RetryConfig,
}

impl Default for ExplorerSettings {
    fn default() -> Self {
        let defaults = ExplorerConfig::default();
        Self {
            page_limit: defaults.page_limit,
            max_concurrent_fetches: defaults.max_concurrent_fetches,
            attribution: defaults.attribution,
            retry: RetryConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    pub distance: LayoutDistance,
    pub tick_interval_ms: u64,
    pub refit_interval_ms: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            distance: LayoutDistance::default(),
            tick_interval_ms: 16,
            refit_interval_ms: REFIT_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Prefix of the link logged when a node is opened.
    pub open_url_base: String,
}

impl Default for HooksConfig {
    fn default() -> Self {
        Self {
            open_url_base: DEFAULT_OPEN_URL_BASE.to_string(),
        }
    }
}

// =============================================================================
// APP CONFIG
// =============================================================================

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ledger: LedgerConfig,
    pub explorer: ExplorerSettings,
    pub layout: LayoutSettings,
    pub hooks: HooksConfig,
}

impl AppConfig {
    /// Read the TOML file at `path`, or start from defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Apply `FUNDFLOW_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply `FUNDFLOW_*` variables from `lookup`.
    pub fn apply_env_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(key.as_str()).map(|value| (key, value))
        };

        if let Some((_, host)) = var("HOST") {
            self.server.host = host;
        }
        if let Some((key, port)) = var("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| invalid(&key, &port, "not a port number"))?;
        }
        if let Some((_, path)) = var("FIXTURE") {
            self.ledger.fixture = Some(PathBuf::from(path));
        }
        if let Some((_, limit)) = var("PAGE_LIMIT") {
            self.explorer.page_limit = PageLimit::parse(&limit)?;
        }
        if let Some((key, n)) = var("MAX_CONCURRENT_FETCHES") {
            self.explorer.max_concurrent_fetches = n
                .trim()
                .parse()
                .map_err(|_| invalid(&key, &n, "not a positive integer"))?;
        }
        if let Some((key, mode)) = var("ATTRIBUTION") {
            self.explorer.attribution = mode.parse().map_err(|e: String| invalid(&key, &mode, e))?;
        }
        if let Some((key, n)) = var("RETRY_MAX_ATTEMPTS") {
            self.explorer.retry.max_attempts = n
                .trim()
                .parse()
                .map_err(|_| invalid(&key, &n, "not an integer"))?;
        }
        if let Some((_, distance)) = var("LAYOUT_DISTANCE") {
            self.layout.distance = LayoutDistance::parse(&distance)?;
        }
        if let Some((_, base)) = var("OPEN_URL_BASE") {
            self.hooks.open_url_base = base;
        }
        Ok(())
    }

    /// Reject settings that would stall the explorer or the driver loops.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.explorer.max_concurrent_fetches == 0 {
            return Err(invalid("explorer.max_concurrent_fetches", 0, "must be at least 1"));
        }
        let retry = &self.explorer.retry;
        if retry.base_delay_ms > retry.max_delay_ms {
            return Err(invalid(
                "explorer.retry.base_delay_ms",
                retry.base_delay_ms,
                "exceeds max_delay_ms",
            ));
        }
        if self.layout.tick_interval_ms == 0 {
            return Err(invalid("layout.tick_interval_ms", 0, "must be positive"));
        }
        if self.layout.refit_interval_ms == 0 {
            return Err(invalid("layout.refit_interval_ms", 0, "must be positive"));
        }
        Ok(())
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    #[must_use]
    pub fn explorer_config(&self) -> ExplorerConfig {
        ExplorerConfig {
            page_limit: self.explorer.page_limit,
            max_concurrent_fetches: self.explorer.max_concurrent_fetches,
            retry: self.explorer.retry.policy(),
            attribution: self.explorer.attribution,
        }
    }

    #[must_use]
    pub fn layout_config(&self) -> LayoutConfig {
        LayoutConfig {
            link_distance: self.layout.distance,
            ..LayoutConfig::default()
        }
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.layout.tick_interval_ms)
    }

    #[must_use]
    pub fn refit_interval(&self) -> Duration {
        Duration::from_millis(self.layout.refit_interval_ms)
    }
}
