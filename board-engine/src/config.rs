//! Engine configuration.
//!
//! The cutoffs here are product policy rather than algorithmic necessity,
//! so they live in one place and can be overridden from a JSON file.

use std::path::Path;

use chrono::Duration;

use crate::domain::LineId;

/// Error loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Configuration parameters for building departure boards.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Departures this far out (minutes, after rounding) show a clock time
    /// instead of a countdown.
    pub distant_future_mins: i64,

    /// A stopped vehicle departing within this many seconds is boarding.
    pub boarding_cutoff_secs: i64,

    /// Departures closer than this many seconds are arriving.
    pub arrival_cutoff_secs: i64,

    /// Departures closer than this many seconds are approaching.
    pub approach_cutoff_secs: i64,

    /// How far ahead (minutes) a non-typical pattern's trips keep its leaf
    /// visible in nearby and unfiltered stop views.
    pub non_typical_horizon_mins: i64,

    /// Local minute of day from which an alert end counts as "end of
    /// service". The window closes at the service day boundary.
    pub end_of_service_start_mins: u32,

    /// Departure rows shown for a leaf with a single headsign.
    pub typical_leaf_rows: usize,

    /// Departure or disruption rows shown for a branching leaf.
    pub branching_leaf_rows: usize,

    /// Lines whose routes merge into a single card.
    pub grouped_line_ids: Vec<LineId>,
}

impl EngineConfig {
    /// Create a new configuration with the given parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        distant_future_mins: i64,
        boarding_cutoff_secs: i64,
        arrival_cutoff_secs: i64,
        approach_cutoff_secs: i64,
        non_typical_horizon_mins: i64,
        end_of_service_start_mins: u32,
        typical_leaf_rows: usize,
        branching_leaf_rows: usize,
        grouped_line_ids: Vec<LineId>,
    ) -> Self {
        Self {
            distant_future_mins,
            boarding_cutoff_secs,
            arrival_cutoff_secs,
            approach_cutoff_secs,
            non_typical_horizon_mins,
            end_of_service_start_mins,
            typical_leaf_rows,
            branching_leaf_rows,
            grouped_line_ids,
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Returns the distant-future cutoff as a Duration.
    pub fn distant_future(&self) -> Duration {
        Duration::minutes(self.distant_future_mins)
    }

    /// Returns the boarding cutoff as a Duration.
    pub fn boarding_cutoff(&self) -> Duration {
        Duration::seconds(self.boarding_cutoff_secs)
    }

    /// Returns the arrival cutoff as a Duration.
    pub fn arrival_cutoff(&self) -> Duration {
        Duration::seconds(self.arrival_cutoff_secs)
    }

    /// Returns the approach cutoff as a Duration.
    pub fn approach_cutoff(&self) -> Duration {
        Duration::seconds(self.approach_cutoff_secs)
    }

    /// Returns the non-typical pattern horizon as a Duration.
    pub fn non_typical_horizon(&self) -> Duration {
        Duration::minutes(self.non_typical_horizon_mins)
    }

    pub fn is_grouped_line(&self, line_id: &LineId) -> bool {
        self.grouped_line_ids.contains(line_id)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            distant_future_mins: 60,
            boarding_cutoff_secs: 90,
            arrival_cutoff_secs: 30,
            approach_cutoff_secs: 60,
            non_typical_horizon_mins: 120, // 2 hours
            end_of_service_start_mins: 150, // 02:30
            typical_leaf_rows: 2,
            branching_leaf_rows: 3,
            grouped_line_ids: LineId::new("line-Green").into_iter().collect(),
        }
    }
}
