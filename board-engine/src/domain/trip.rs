//! Trips and shapes.

use super::{RouteId, RoutePatternId, ShapeId, StopId, TripId};

/// One run of a vehicle along a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Trip {
    pub id: TripId,
    pub route_id: RouteId,
    /// Missing for a handful of added trips.
    #[serde(default)]
    pub route_pattern_id: Option<RoutePatternId>,
    pub direction_id: u8,
    pub headsign: String,
    /// Stops served, in order. Only populated for representative trips.
    #[serde(default)]
    pub stop_ids: Vec<StopId>,
    #[serde(default)]
    pub shape_id: Option<ShapeId>,
}

impl Trip {
    /// Position of `stop_id` in this trip's stop list.
    pub fn stop_index(&self, stop_id: &StopId) -> Option<usize> {
        self.stop_ids.iter().position(|s| s == stop_id)
    }

    pub fn last_stop(&self) -> Option<&StopId> {
        self.stop_ids.last()
    }
}

/// The drawn path of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Shape {
    pub id: ShapeId,
    /// Google encoded polyline.
    pub polyline: String,
}
