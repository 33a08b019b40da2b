//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::engine::BoardOutput;

/// Query for a departure board.
#[derive(Debug, Default, Deserialize)]
pub struct BoardQuery {
    /// Comma-separated stop ids, most relevant first
    pub stops: String,

    /// One of `nearby`, `stop_details`, `stop_details_filtered` or
    /// `favorites` (defaults to `nearby`)
    pub context: Option<String>,

    /// Caller latitude, used with `lon` for distance ordering
    pub lat: Option<f64>,

    /// Caller longitude
    pub lon: Option<f64>,

    /// Comma-separated card ids to pin to the top
    pub pinned: Option<String>,

    /// RFC 3339 instant to build the board for (defaults to now)
    pub at: Option<String>,
}

/// Query for a stop's alert status.
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// RFC 3339 instant (defaults to now)
    pub at: Option<String>,
}

/// A board, or `loading` while realtime feeds are still arriving.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    /// The instant the board was built for
    pub at: String,

    /// True until predictions and alerts have both arrived
    pub loading: bool,

    pub board: Option<BoardOutput>,
}

/// Acknowledgement of a replaced feed.
#[derive(Debug, Serialize)]
pub struct FeedReplaced {
    pub feed: String,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Split a comma-separated list, dropping empty items.
pub(crate) fn split_list(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}
