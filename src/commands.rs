//! Replies for the chat command surface: subscribe, unsubscribe, list.
//!
//! Users address sites by display name (or raw id), and may use
//! [`ALL_SITES_TOKEN`] for every site. Every reply is a short human-readable
//! line; failures never surface as structured errors.

use crate::scheduler::JobScheduler;
use crate::subscriptions::{ALL_SITES_TOKEN, SubscriptionRegistry};
use std::fmt::Write;

/// Description shown for a followed site that is no longer registered.
pub const UNAVAILABLE_DESCRIPTION: &str = "(description unavailable)";

/// Who issued a command, and therefore who gets subscribed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub id: String,
    pub is_group: bool,
}

impl Recipient {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_group: false,
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_group: true,
        }
    }

    fn label(&self) -> &'static str {
        if self.is_group { "group" } else { "user" }
    }
}

/// One site line in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedSite {
    pub id: String,
    pub display_name: String,
    pub description: String,
}

/// Every known site, split by whether the recipient follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionListing {
    /// The recipient holds the all-sites subscription.
    pub all_sites: bool,
    pub subscribed: Vec<ListedSite>,
    pub unsubscribed: Vec<ListedSite>,
}

impl SubscriptionListing {
    /// Render the listing as chat text.
    pub fn render(&self) -> String {
        if self.subscribed.is_empty() && self.unsubscribed.is_empty() {
            return "No sites available".to_owned();
        }

        let mut out = String::new();
        if self.all_sites || !self.subscribed.is_empty() {
            out.push_str("Subscribed:\n");
            if self.all_sites {
                let _ = writeln!(out, "✓ {ALL_SITES_TOKEN} - every site");
            }
            for site in &self.subscribed {
                push_line(&mut out, '✓', site);
            }
        }
        if !self.unsubscribed.is_empty() {
            out.push_str("Not subscribed:\n");
            for site in &self.unsubscribed {
                push_line(&mut out, '○', site);
            }
        }
        out.truncate(out.trim_end().len());
        out
    }
}

fn push_line(out: &mut String, marker: char, site: &ListedSite) {
    if site.description.is_empty() {
        let _ = writeln!(out, "{marker} {}", site.display_name);
    } else {
        let _ = writeln!(out, "{marker} {} - {}", site.display_name, site.description);
    }
}

/// Command handlers bound to a scheduler's sites and a registry.
pub struct CommandSurface<'a> {
    scheduler: &'a JobScheduler,
    subscriptions: &'a SubscriptionRegistry,
}

enum Target<'a> {
    Site { id: &'a str, name: &'a str },
    All,
}

impl<'a> Target<'a> {
    fn key(&self) -> &'a str {
        match self {
            Self::Site { id, .. } => *id,
            Self::All => ALL_SITES_TOKEN,
        }
    }

    fn name(&self) -> &'a str {
        match self {
            Self::Site { name, .. } => *name,
            Self::All => ALL_SITES_TOKEN,
        }
    }
}

impl<'a> CommandSurface<'a> {
    pub fn new(scheduler: &'a JobScheduler, subscriptions: &'a SubscriptionRegistry) -> Self {
        Self {
            scheduler,
            subscriptions,
        }
    }

    fn target(&self, name: &str) -> Result<Target<'a>, String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(format!(
                "Please name a site, or use {ALL_SITES_TOKEN} for every site"
            ));
        }
        if name == ALL_SITES_TOKEN {
            return Ok(Target::All);
        }
        let scheduler = self.scheduler;
        scheduler
            .resolve(name)
            .and_then(|id| scheduler.site(id))
            .map(|site| Target::Site {
                id: site.id(),
                name: site.display_name(),
            })
            .ok_or_else(|| {
                format!("Unknown site `{name}`. Send the list command to see every site")
            })
    }

    /// Subscribe `recipient` to the site named `name`.
    pub fn subscribe(&self, recipient: &Recipient, name: &str) -> String {
        let target = match self.target(name) {
            Ok(target) => target,
            Err(reply) => return reply,
        };
        let who = recipient.label();
        let id = &recipient.id;
        let site = target.name();
        match self
            .subscriptions
            .subscribe(id, target.key(), recipient.is_group)
        {
            Ok(true) => format!("{who} {id} subscribed to {site}"),
            Ok(false) => format!("{who} {id} is already subscribed to {site}"),
            Err(e) => {
                tracing::error!(recipient = %id, site, error = %e, "subscribe failed");
                "Could not save the subscription, please try again later".to_owned()
            }
        }
    }

    /// Unsubscribe `recipient` from the site named `name`.
    ///
    /// A site that is no longer registered can still be removed by its id,
    /// as long as the recipient follows it.
    pub fn unsubscribe(&self, recipient: &Recipient, name: &str) -> String {
        let (key, site) = match self.target(name) {
            Ok(target) => (target.key(), target.name()),
            Err(reply) => {
                let stale = name.trim();
                let followed = self
                    .subscriptions
                    .subscriptions_of(&recipient.id, recipient.is_group);
                if stale.is_empty() || !followed.contains(stale) {
                    return reply;
                }
                (stale, stale)
            }
        };
        let who = recipient.label();
        let id = &recipient.id;
        match self.subscriptions.unsubscribe(id, key, recipient.is_group) {
            Ok(true) => format!("{who} {id} unsubscribed from {site}"),
            Ok(false) => format!("{who} {id} is not subscribed to {site}"),
            Err(e) => {
                tracing::error!(recipient = %id, site, error = %e, "unsubscribe failed");
                "Could not save the subscription, please try again later".to_owned()
            }
        }
    }

    /// Partition every registered site by whether `recipient` follows it.
    ///
    /// Subscriptions to sites that are no longer registered are listed as
    /// subscribed, by id, with [`UNAVAILABLE_DESCRIPTION`].
    pub fn list_subscriptions(&self, recipient: &Recipient) -> SubscriptionListing {
        let followed = self
            .subscriptions
            .subscriptions_of(&recipient.id, recipient.is_group);
        let mut listing = SubscriptionListing {
            all_sites: followed.contains(ALL_SITES_TOKEN),
            ..SubscriptionListing::default()
        };
        for site in self.scheduler.sites() {
            let entry = ListedSite {
                id: site.id().to_owned(),
                display_name: site.display_name().to_owned(),
                description: site.description().to_owned(),
            };
            if followed.contains(site.id()) {
                listing.subscribed.push(entry);
            } else {
                listing.unsubscribed.push(entry);
            }
        }
        for id in &followed {
            if id == ALL_SITES_TOKEN || self.scheduler.site(id).is_some() {
                continue;
            }
            listing.subscribed.push(ListedSite {
                id: id.clone(),
                display_name: id.clone(),
                description: UNAVAILABLE_DESCRIPTION.to_owned(),
            });
        }
        listing
    }
}
