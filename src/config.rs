//! Configuration types for the site monitor.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level monitor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Where subscription and snapshot state is persisted.
    pub storage: StorageConfig,
    /// Chat transport used to deliver notifications.
    pub transport: TransportConfig,
    /// Cron evaluation settings.
    pub schedule: ScheduleConfig,
    /// Which sites are registered at startup.
    pub sites: SitesConfig,
    /// Log output settings.
    pub logging: LoggingConfig,
}

/// Persistence locations. `None` means the platform default from
/// [`crate::sitewatch_dirs`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Subscription document path.
    pub subscriptions_file: Option<PathBuf>,
    /// Directory holding one snapshot file per site.
    pub snapshot_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved subscription document path.
    #[must_use]
    pub fn subscriptions_path(&self) -> PathBuf {
        self.subscriptions_file
            .clone()
            .unwrap_or_else(crate::sitewatch_dirs::subscriptions_file)
    }

    /// Resolved snapshot directory.
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_dir
            .clone()
            .unwrap_or_else(crate::sitewatch_dirs::snapshots_dir)
    }
}

/// OneBot v11 HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Base URL of the OneBot HTTP API (e.g. `http://127.0.0.1:5700`).
    pub onebot_url: String,
    /// Optional bearer token expected by the OneBot implementation.
    pub access_token: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            onebot_url: "http://127.0.0.1:5700".to_owned(),
            access_token: None,
            timeout_secs: 10,
        }
    }
}

/// Time zone used when evaluating cron expressions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CronTimezone {
    /// Host local time.
    #[default]
    Local,
    /// Coordinated universal time.
    Utc,
}

/// Cron evaluation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Time zone for cron fields.
    pub timezone: CronTimezone,
}

/// Built-in and configured sites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Register the `example` counter site (fires every 10 seconds).
    pub example: bool,
    /// Generic JSON endpoints to watch.
    pub http_json: Vec<HttpJsonSiteConfig>,
}

/// A JSON endpoint polled with a plain GET request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpJsonSiteConfig {
    /// Unique site identifier.
    pub id: String,
    /// Name shown to users and accepted by the subscribe command.
    pub display_name: String,
    /// One-line description shown in subscription listings.
    pub description: String,
    /// Endpoint URL.
    pub url: String,
    /// `interval:<secs>` or a five-field cron expression.
    pub schedule: String,
    /// JSON pointer selecting the part of the response that is compared.
    /// `None` compares the whole document.
    pub watch_pointer: Option<String>,
    /// JSON pointer selecting the headline used in notifications.
    pub title_pointer: Option<String>,
    /// Notify on the very first fetch, when no snapshot exists yet.
    pub notify_on_first: bool,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpJsonSiteConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            display_name: String::new(),
            description: String::new(),
            url: String::new(),
            schedule: "*/30 * * * *".to_owned(),
            watch_pointer: None,
            title_pointer: None,
            notify_on_first: true,
            timeout_secs: 15,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write a daily rolling log file under the logs directory.
    pub file: bool,
    /// Default `EnvFilter` directive when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: false,
            filter: "sitewatch=info".to_owned(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            toml::from_str(&content).map_err(|e| MonitorError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MonitorError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        crate::sitewatch_dirs::config_file()
    }

    /// Check values that serde cannot.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.transport.onebot_url.trim().is_empty() {
            return Err(MonitorError::Config(
                "transport.onebot_url must not be empty".into(),
            ));
        }
        if self.transport.timeout_secs == 0 {
            return Err(MonitorError::Config(
                "transport.timeout_secs must be greater than 0".into(),
            ));
        }
        for site in &self.sites.http_json {
            if site.url.trim().is_empty() {
                return Err(MonitorError::Config(format!(
                    "sites.http_json `{}` has no url",
                    site.id
                )));
            }
            if site.timeout_secs == 0 {
                return Err(MonitorError::Config(format!(
                    "sites.http_json `{}` timeout_secs must be greater than 0",
                    site.id
                )));
            }
        }
        Ok(())
    }
}
