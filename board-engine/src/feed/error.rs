//! Feed loading error types.

use crate::domain::DomainError;

/// Errors that can occur when loading or replacing a feed snapshot.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Reading a snapshot file failed
    #[error("failed to read feed: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot is not valid JSON for its feed
    #[error("failed to decode feed: {0}")]
    Json(#[from] serde_json::Error),

    /// The static snapshot is internally inconsistent
    #[error("invalid static data: {0}")]
    Invalid(#[from] DomainError),

    /// No feed goes by this name
    #[error("unknown feed: {0}")]
    UnknownFeed(String),
}
