//! Vehicle positions.

use crate::domain::{Position, RouteId, StopId, TripId, VehicleId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentStatus {
    IncomingAt,
    StoppedAt,
    InTransitTo,
}

/// A vehicle's last reported position and the stop it relates to.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vehicle {
    pub id: VehicleId,
    #[serde(default)]
    pub trip_id: Option<TripId>,
    #[serde(default)]
    pub route_id: Option<RouteId>,
    #[serde(default)]
    pub direction_id: u8,
    #[serde(default)]
    pub stop_id: Option<StopId>,
    pub current_status: CurrentStatus,
    pub latitude: f64,
    pub longitude: f64,
}

impl Vehicle {
    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }

    /// True if the vehicle is stopped at `stop_id` while running `trip_id`.
    pub fn is_stopped_at(&self, stop_id: &StopId, trip_id: &TripId) -> bool {
        self.current_status == CurrentStatus::StoppedAt
            && self.stop_id.as_ref() == Some(stop_id)
            && self.trip_id.as_ref() == Some(trip_id)
    }
}
