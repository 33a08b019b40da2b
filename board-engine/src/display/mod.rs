//! Turning schedules, predictions and vehicles into departure rows.

pub(crate) mod trip_display;
mod upcoming;

pub use trip_display::TripInstantDisplay;
pub use upcoming::{FormattedTrip, UpcomingTrip, all_arrival_only};
