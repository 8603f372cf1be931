//! Centralized directory paths for sitewatch.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Directory Layout
//!
//! | Purpose | macOS | Linux |
//! |---------|-------|-------|
//! | Data (subscriptions, logs) | `~/Library/Application Support/sitewatch/` | `~/.local/share/sitewatch/` |
//! | Config | `~/Library/Application Support/sitewatch/` | `~/.config/sitewatch/` |
//! | Cache (site snapshots) | `~/Library/Caches/sitewatch/` | `~/.cache/sitewatch/` |
//!
//! # Environment Overrides
//!
//! - `SITEWATCH_DATA_DIR` overrides [`data_dir`]
//! - `SITEWATCH_CONFIG_DIR` overrides [`config_dir`]
//! - `SITEWATCH_CACHE_DIR` overrides [`cache_dir`]

use std::path::PathBuf;

const APP_DIR: &str = "sitewatch";

/// Application data root directory.
///
/// Holds the subscription document and log files. Resolves to
/// `dirs::data_dir()/sitewatch/` unless `SITEWATCH_DATA_DIR` is set.
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SITEWATCH_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/sitewatch-data"))
}

/// Application config directory (`config.toml`).
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SITEWATCH_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/sitewatch-config"))
}

/// Application cache directory.
///
/// Per-site snapshots live here; deleting it only causes every site to
/// report its next fetch as new.
#[must_use]
pub fn cache_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SITEWATCH_CACHE_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::cache_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("/tmp/sitewatch-cache"))
}

/// Log file directory (`data_dir()/logs/`).
#[must_use]
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Main config file path (`config_dir()/config.toml`).
#[must_use]
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Subscription document path (`data_dir()/subscriptions.json`).
#[must_use]
pub fn subscriptions_file() -> PathBuf {
    data_dir().join("subscriptions.json")
}

/// Snapshot directory (`cache_dir()/snapshots/`).
#[must_use]
pub fn snapshots_dir() -> PathBuf {
    cache_dir().join("snapshots")
}
