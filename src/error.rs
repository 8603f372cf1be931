//! Error types for the site monitor.

/// Top-level error type for the polling/notification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Malformed cron or interval schedule specification.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Site adapter rejected at load time.
    #[error("adapter load error: {0}")]
    AdapterLoad(String),

    /// Snapshot or subscription state could not be read or written.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Unknown site identifier or display name.
    #[error("unknown site: {0}")]
    UnknownSite(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, MonitorError>;
