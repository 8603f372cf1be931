//! sitewatch: polls external sites and pushes change notifications to chat
//! recipients.
//!
//! # Architecture
//!
//! Each registered site is an adapter that knows how to fetch, compare and
//! format its own data. The rest of the crate is plumbing around it:
//! - **Sites**: adapter contract, built-in adapters and the load-time validator
//! - **Scheduler**: one cron or interval job per site, never overlapping itself
//! - **Snapshots**: last observed payload per site, used for change detection
//! - **Subscriptions**: site → users/groups registry, plus the reserved "all" group
//! - **Channels**: delivery with group-first, individual-fallback targeting
//! - **Commands**: subscribe / unsubscribe / list replies for a chat front end

pub mod channels;
pub mod commands;
pub mod config;
pub mod error;
pub mod monitor;
pub mod scheduler;
pub mod sites;
pub mod sitewatch_dirs;
pub mod snapshot;
pub mod subscriptions;

pub use commands::{CommandSurface, Recipient, SubscriptionListing};
pub use config::MonitorConfig;
pub use error::{MonitorError, Result};
pub use monitor::Monitor;
pub use scheduler::{CycleOutcome, JobScheduler};
pub use sites::{Payload, SiteAdapter, SiteDescriptor};
pub use subscriptions::{ALL_SITES_KEY, ALL_SITES_TOKEN, SubscriptionRegistry};
