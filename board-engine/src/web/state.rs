//! Application state for the web layer.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::feed::FeedStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Latest feed snapshots
    pub feeds: FeedStore,

    /// Board building configuration
    pub config: Arc<EngineConfig>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(feeds: FeedStore, config: EngineConfig) -> Self {
        Self {
            feeds,
            config: Arc::new(config),
        }
    }
}
