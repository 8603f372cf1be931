//! Subscription registry: which users and groups follow which sites.
//!
//! Every mutation is persisted before it is committed in memory. If the
//! write fails the call returns an error and the in-memory table is left
//! exactly as it was. Mutations are serialized by a writer lock that is held
//! across the file write; readers only take the table lock, which is never
//! held during I/O.

pub mod store;

use crate::error::Result;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

pub use store::{SubscriptionRecord, SubscriptionStore, SubscriptionTable};

/// Reserved internal site id for "every site".
pub const ALL_SITES_KEY: &str = "all";

/// Token users type (and see) for the all-sites subscription.
pub const ALL_SITES_TOKEN: &str = "全部";

/// Map a user-facing site name to its registry key.
pub(crate) fn internal_key(site: &str) -> &str {
    if site == ALL_SITES_TOKEN {
        ALL_SITES_KEY
    } else {
        site
    }
}

/// Map a registry key back to what users see.
fn external_key(key: &str) -> &str {
    if key == ALL_SITES_KEY {
        ALL_SITES_TOKEN
    } else {
        key
    }
}

/// Thread-safe subscription registry backed by a [`SubscriptionStore`].
#[derive(Debug)]
pub struct SubscriptionRegistry {
    store: SubscriptionStore,
    writer: Mutex<()>,
    table: Mutex<SubscriptionTable>,
}

impl SubscriptionRegistry {
    /// Load the registry from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or initialised.
    pub fn open(store: SubscriptionStore) -> Result<Self> {
        let table = store.load()?;
        tracing::info!(sites = table.len(), "subscription registry loaded");
        Ok(Self {
            store,
            writer: Mutex::new(()),
            table: Mutex::new(table),
        })
    }

    /// Registry that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            store: SubscriptionStore::in_memory(),
            writer: Mutex::new(()),
            table: Mutex::new(SubscriptionTable::new()),
        }
    }

    /// Add `recipient` to `site`. `site` may be [`ALL_SITES_TOKEN`].
    ///
    /// Returns `Ok(false)` if the recipient was already subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if the new state cannot be persisted; nothing changes.
    pub fn subscribe(&self, recipient: &str, site: &str, is_group: bool) -> Result<bool> {
        let key = internal_key(site);
        let added = self.mutate(|table| {
            let ids = table.entry(key.to_owned()).or_default().recipients_mut(is_group);
            if ids.iter().any(|id| id == recipient) {
                return false;
            }
            ids.push(recipient.to_owned());
            true
        })?;
        if added {
            tracing::info!(recipient, site = key, is_group, "subscribed");
        }
        Ok(added)
    }

    /// Remove `recipient` from `site`, pruning the site's record once it is
    /// empty (the all-sites record is kept).
    ///
    /// Returns `Ok(false)` if the recipient was not subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if the new state cannot be persisted; nothing changes.
    pub fn unsubscribe(&self, recipient: &str, site: &str, is_group: bool) -> Result<bool> {
        let key = internal_key(site);
        let removed = self.mutate(|table| {
            let Some(record) = table.get_mut(key) else {
                return false;
            };
            let ids = record.recipients_mut(is_group);
            let Some(pos) = ids.iter().position(|id| id == recipient) else {
                return false;
            };
            ids.remove(pos);
            if record.is_empty() && key != ALL_SITES_KEY {
                table.remove(key);
            }
            true
        })?;
        if removed {
            tracing::info!(recipient, site = key, is_group, "unsubscribed");
        }
        Ok(removed)
    }

    /// Sites `recipient` follows, as users see them (the all-sites record
    /// appears as [`ALL_SITES_TOKEN`]).
    pub fn subscriptions_of(&self, recipient: &str, is_group: bool) -> BTreeSet<String> {
        self.lock()
            .iter()
            .filter(|(_, record)| record.recipients(is_group).iter().any(|id| id == recipient))
            .map(|(key, _)| external_key(key).to_owned())
            .collect()
    }

    /// Everyone to notify about `site_id`: its users and groups, then the
    /// all-sites users and groups. A recipient appears once, at its first
    /// position.
    pub fn subscribers_of(&self, site_id: &str) -> Vec<String> {
        let table = self.lock();
        let mut seen = HashSet::new();
        [table.get(site_id), table.get(ALL_SITES_KEY)]
            .into_iter()
            .flatten()
            .flat_map(|record| record.users.iter().chain(record.groups.iter()))
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Snapshot of the full table, keyed internally.
    pub fn all_subscriptions(&self) -> SubscriptionTable {
        self.lock().clone()
    }

    /// Apply `change` to a copy of the table; persist and commit only if it
    /// reports a modification.
    fn mutate(&self, change: impl FnOnce(&mut SubscriptionTable) -> bool) -> Result<bool> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = self.lock().clone();
        if !change(&mut next) {
            return Ok(false);
        }
        if let Err(e) = self.store.save(&next) {
            tracing::error!(error = %e, "failed to persist subscriptions, change discarded");
            return Err(e);
        }
        *self.lock() = next;
        Ok(true)
    }

    fn lock(&self) -> MutexGuard<'_, SubscriptionTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
