//! On-disk subscription document.
//!
//! The canonical layout is site-keyed:
//!
//! ```json
//! { "news": { "users": ["2002"], "groups": ["1001"] }, "all": { "users": [], "groups": [] } }
//! ```
//!
//! Older deployments stored a recipient-keyed layout (`{ "2002": ["news"] }`).
//! Those documents are migrated on load, treating every recipient as an
//! individual user, and rewritten in the canonical layout.

use super::internal_key;
use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Site id → subscribers.
pub type SubscriptionTable = BTreeMap<String, SubscriptionRecord>;

/// Subscribers of one site, partitioned by delivery kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(default)]
    pub users: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl SubscriptionRecord {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.groups.is_empty()
    }

    pub fn recipients(&self, is_group: bool) -> &[String] {
        if is_group { &self.groups } else { &self.users }
    }

    pub(crate) fn recipients_mut(&mut self, is_group: bool) -> &mut Vec<String> {
        if is_group {
            &mut self.groups
        } else {
            &mut self.users
        }
    }
}

/// Where the subscription document lives. `None` keeps state in memory only.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionStore {
    path: Option<PathBuf>,
}

impl SubscriptionStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Read the document, creating an empty one if it does not exist.
    ///
    /// A document that cannot be decoded is moved aside to
    /// `*.json.<utc timestamp>.corrupt` and replaced with an empty one.
    /// Earlier backups are never overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or if the
    /// replacement document cannot be written.
    pub fn load(&self) -> Result<SubscriptionTable> {
        let Some(path) = &self.path else {
            return Ok(SubscriptionTable::new());
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let table = SubscriptionTable::new();
                self.save(&table)?;
                tracing::info!(path = %path.display(), "created empty subscription store");
                return Ok(table);
            }
            Err(e) => return Err(e.into()),
        };

        match decode(&bytes) {
            Ok((table, false)) => Ok(table),
            Ok((table, true)) => {
                tracing::warn!(
                    path = %path.display(),
                    sites = table.len(),
                    "migrated recipient-keyed subscription document; all recipients treated as users"
                );
                self.save(&table)?;
                Ok(table)
            }
            Err(e) => {
                let aside = corrupt_backup_path(path);
                tracing::error!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "subscription document is unreadable, starting empty"
                );
                std::fs::rename(path, &aside)?;
                let table = SubscriptionTable::new();
                self.save(&table)?;
                Ok(table)
            }
        }
    }

    /// Write the full table.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Persistence`] or [`MonitorError::Io`] if the
    /// document cannot be written.
    pub fn save(&self, table: &SubscriptionTable) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_vec_pretty(table)
            .map_err(|e| MonitorError::Persistence(format!("encoding subscriptions: {e}")))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }
}

/// A backup name next to `path` that no earlier backup uses.
fn corrupt_backup_path(path: &Path) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
    let name = path
        .file_name()
        .map_or_else(|| "subscriptions.json".into(), |n| n.to_string_lossy());
    let mut aside = path.with_file_name(format!("{name}.{stamp}.corrupt"));
    let mut n = 1;
    while aside.exists() {
        aside = path.with_file_name(format!("{name}.{stamp}-{n}.corrupt"));
        n += 1;
    }
    aside
}

/// Decode either layout. The flag is `true` when the legacy layout was found.
fn decode(bytes: &[u8]) -> Result<(SubscriptionTable, bool)> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_slice(bytes)
        .map_err(|e| MonitorError::Persistence(format!("invalid subscription JSON: {e}")))?;

    let legacy = !raw.is_empty() && raw.values().all(serde_json::Value::is_array);
    let mut table = SubscriptionTable::new();

    if legacy {
        for (recipient, sites) in raw {
            let sites: Vec<String> = serde_json::from_value(sites).map_err(|e| {
                MonitorError::Persistence(format!("recipient `{recipient}`: {e}"))
            })?;
            for site in sites {
                let users = &mut table.entry(internal_key(&site).to_owned()).or_default().users;
                if !users.contains(&recipient) {
                    users.push(recipient.clone());
                }
            }
        }
        return Ok((table, true));
    }

    for (site, record) in raw {
        let mut record: SubscriptionRecord = serde_json::from_value(record)
            .map_err(|e| MonitorError::Persistence(format!("site `{site}`: {e}")))?;
        dedup_in_order(&mut record.users);
        dedup_in_order(&mut record.groups);
        table.insert(site, record);
    }
    Ok((table, false))
}

fn dedup_in_order(ids: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}
