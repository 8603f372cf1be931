use async_trait::async_trait;
use std::fmt;

/// Which kind of chat target a send addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Group,
    User,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Group => "group",
            Self::User => "user",
        })
    }
}

/// Why a single send failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The id does not name a target of this kind. Dispatch retries a group
    /// send as an individual send on this error only.
    #[error("`{id}` is not a valid {kind} target")]
    InvalidTarget { kind: TargetKind, id: String },

    /// The transport understood the request and refused it.
    #[error("message rejected: {0}")]
    Rejected(String),

    /// The transport could not be reached or answered nonsense.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Delivery transport contract. New chat platforms only need to implement this trait.
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Stable transport identifier (e.g. `onebot`).
    fn id(&self) -> &'static str;

    /// Post `text` to a group chat.
    async fn send_group_message(&self, group_id: &str, text: &str) -> Result<(), DeliveryError>;

    /// Post `text` to one person.
    async fn send_individual_message(&self, user_id: &str, text: &str)
    -> Result<(), DeliveryError>;
}
