//! Configuration module for feedbell.

use serde::Deserialize;
use std::path::Path;

use crate::{FeedbellError, Result};

/// Environment variable that overrides `bot.token`.
pub const BOT_TOKEN_ENV: &str = "FEEDBELL_BOT_TOKEN";

/// Telegram bot configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    /// Bot API token issued by BotFather.
    #[serde(default)]
    pub token: String,
    /// Base URL of the Bot API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Long-polling timeout for `getUpdates` in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/feedbell.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Scan configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// Interval between scans in seconds.
    #[serde(default = "default_scan_interval")]
    pub interval_secs: u64,
    /// Zone that watermark and entry timestamps are compared in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Total timeout for a single feed fetch in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Maximum feed size in bytes.
    #[serde(default = "default_max_feed_size")]
    pub max_feed_size_bytes: u64,
    /// Maximum number of redirects.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Number of entries per feed returned by the `/send` command.
    #[serde(default = "default_latest_items")]
    pub latest_items: usize,
    /// How long shutdown waits for an in-flight scan, in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_scan_interval() -> u64 {
    1800 // 30 minutes
}

fn default_timezone() -> String {
    "Asia/Taipei".to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_feed_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_max_redirects() -> usize {
    5
}

fn default_latest_items() -> usize {
    5
}

fn default_shutdown_grace() -> u64 {
    60
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_scan_interval(),
            timezone: default_timezone(),
            fetch_timeout_secs: default_fetch_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            max_feed_size_bytes: default_max_feed_size(),
            max_redirects: default_max_redirects(),
            latest_items: default_latest_items(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/feedbell.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Bot configuration.
    #[serde(default)]
    pub bot: BotConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Scan configuration.
    #[serde(default)]
    pub scan: ScanConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FeedbellError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FeedbellError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FEEDBELL_BOT_TOKEN`: Override the bot token
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var(BOT_TOKEN_ENV) {
            if !token.is_empty() {
                self.bot.token = token;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The bot token is not set
    /// - The timezone is not a known IANA zone
    /// - The scan interval is zero
    pub fn validate(&self) -> Result<()> {
        if self.bot.token.is_empty() {
            return Err(FeedbellError::Config(format!(
                "bot token is not set. Set it in config.toml or via {BOT_TOKEN_ENV}."
            )));
        }
        crate::datetime::parse_timezone(&self.scan.timezone)?;
        if self.scan.interval_secs == 0 {
            return Err(FeedbellError::Config(
                "scan.interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
