//! Compact tiles: one soonest departure per route and headsign.

use std::collections::HashSet;

use crate::display::FormattedTrip;
use crate::domain::RouteId;

use super::format::{LeafFormat, formatted_trips};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Tile {
    pub route_id: RouteId,
    pub headsign: String,
    pub trip: FormattedTrip,
}

impl LeafFormat {
    /// A tile for each distinct route and headsign among the format's
    /// departures, keeping the first (soonest) trip of each.
    pub fn tiles(&self) -> Vec<Tile> {
        let mut seen: HashSet<(&RouteId, &str)> = HashSet::new();
        formatted_trips(self)
            .into_iter()
            .filter(|trip| seen.insert((&trip.route_id, trip.headsign.as_str())))
            .map(|trip| Tile {
                route_id: trip.route_id.clone(),
                headsign: trip.headsign.clone(),
                trip: trip.clone(),
            })
            .collect()
    }
}
