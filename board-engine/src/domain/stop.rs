//! Stops and the station hierarchy.
//!
//! Stops form a shallow tree: a station owns platforms, entrances and other
//! nodes, each of which points back at its parent. The tree is stored as an
//! arena keyed by [`StopId`]; relationships are ids, never references, so a
//! whole snapshot can be swapped without fixing up pointers.

use std::collections::HashMap;

use super::{Position, StopId};

/// GTFS `location_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    Stop,
    Station,
    Entrance,
    GenericNode,
    BoardingArea,
}

/// A stop, station or station component.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub location_type: LocationType,
    /// The station this stop belongs to, if any.
    #[serde(default)]
    pub parent_station_id: Option<StopId>,
    #[serde(default)]
    pub child_stop_ids: Vec<StopId>,
    #[serde(default)]
    pub connecting_stop_ids: Vec<StopId>,
}

impl Stop {
    /// Create a standalone stop with no parent or children.
    pub fn new(id: StopId, name: impl Into<String>, position: Position) -> Self {
        Self {
            id,
            name: name.into(),
            latitude: position.latitude,
            longitude: position.longitude,
            location_type: LocationType::Stop,
            parent_station_id: None,
            child_stop_ids: Vec::new(),
            connecting_stop_ids: Vec::new(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.latitude, self.longitude)
    }

    /// Distance from `position` in metres.
    pub fn distance_from(&self, position: &Position) -> f64 {
        self.position().distance_to(position)
    }

    /// Returns the parent station if it is present in `stops`, else this stop.
    pub fn resolve_parent<'a>(&'a self, stops: &'a HashMap<StopId, Stop>) -> &'a Stop {
        self.parent_station_id
            .as_ref()
            .and_then(|parent| stops.get(parent))
            .unwrap_or(self)
    }

    /// True if `stop_id` is this stop or one of its children.
    pub fn is_family_member(&self, stop_id: &StopId) -> bool {
        &self.id == stop_id || self.child_stop_ids.contains(stop_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> StopId {
        StopId::new(s).unwrap()
    }

    fn station_with_platform() -> HashMap<StopId, Stop> {
        let mut parent = Stop::new(
            id("place-pktrm"),
            "Park Street",
            Position::new(42.356, -71.062),
        );
        parent.location_type = LocationType::Station;
        parent.child_stop_ids = vec![id("70075")];

        let mut child = Stop::new(id("70075"), "Park Street", Position::new(42.356, -71.062));
        child.parent_station_id = Some(parent.id.clone());

        [parent, child].into_iter().map(|s| (s.id.clone(), s)).collect()
    }

    #[test]
    fn resolve_parent_walks_up() {
        let stops = station_with_platform();
        let child = &stops["70075"];
        assert_eq!(child.resolve_parent(&stops).id, id("place-pktrm"));
    }

    #[test]
    fn resolve_parent_of_station_is_itself() {
        let stops = station_with_platform();
        let parent = &stops["place-pktrm"];
        assert_eq!(parent.resolve_parent(&stops).id, parent.id);
    }

    #[test]
    fn resolve_parent_with_dangling_reference_is_itself() {
        let mut stops = station_with_platform();
        stops.remove("place-pktrm");
        let child = &stops["70075"];
        assert_eq!(child.resolve_parent(&stops).id, id("70075"));
    }

    #[test]
    fn family_membership() {
        let stops = station_with_platform();
        let parent = &stops["place-pktrm"];
        assert!(parent.is_family_member(&id("place-pktrm")));
        assert!(parent.is_family_member(&id("70075")));
        assert!(!parent.is_family_member(&id("70076")));
    }

    #[test]
    fn deserialize_defaults() {
        let json = r#"{"id": "1", "name": "Stop 1", "latitude": 1.0, "longitude": 2.0}"#;
        let stop: Stop = serde_json::from_str(json).unwrap();
        assert_eq!(stop.location_type, LocationType::Stop);
        assert!(stop.parent_station_id.is_none());
        assert!(stop.child_stop_ids.is_empty());
    }
}
