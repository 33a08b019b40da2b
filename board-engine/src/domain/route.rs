//! Routes, lines and directions.

use std::cmp::Ordering;

use super::{LineId, RouteId};

/// Mode of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteType {
    LightRail,
    HeavyRail,
    CommuterRail,
    Bus,
    Ferry,
}

impl RouteType {
    /// Light and heavy rail. Riders only trust realtime data on subway.
    pub fn is_subway(&self) -> bool {
        matches!(self, RouteType::LightRail | RouteType::HeavyRail)
    }

    /// Any rail mode, including commuter rail.
    pub fn is_rail(&self) -> bool {
        matches!(
            self,
            RouteType::LightRail | RouteType::HeavyRail | RouteType::CommuterRail
        )
    }
}

/// A route from the static reference snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Route {
    pub id: RouteId,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub text_color: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    pub sort_order: i32,
    /// Direction names indexed by direction id, e.g. `["South", "North"]`.
    #[serde(default)]
    pub direction_names: Vec<Option<String>>,
    /// Direction destinations indexed by direction id.
    #[serde(default)]
    pub direction_destinations: Vec<Option<String>>,
    #[serde(default)]
    pub line_id: Option<LineId>,
}

impl Route {
    /// The rider-facing label: short name when there is one, else long name.
    pub fn label(&self) -> &str {
        if self.short_name.is_empty() {
            &self.long_name
        } else {
            &self.short_name
        }
    }

    /// Replacement shuttle routes are never merged into their line.
    pub fn is_shuttle(&self) -> bool {
        self.id.as_str().starts_with("Shuttle")
    }

    pub fn direction(&self, direction_id: u8) -> Direction {
        Direction::for_route(self, direction_id)
    }
}

impl Ord for Route {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Route {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A set of routes sharing a rider-facing identity, e.g. the branches of
/// the Green Line.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Line {
    pub id: LineId,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub text_color: String,
    pub sort_order: i32,
}

/// One direction of travel on a route.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Direction {
    pub name: Option<String>,
    pub destination: Option<String>,
    pub id: u8,
}

impl Direction {
    /// Build the direction from the route's per-direction names.
    pub fn for_route(route: &Route, direction_id: u8) -> Self {
        let idx = direction_id as usize;
        Self {
            name: route.direction_names.get(idx).cloned().flatten(),
            destination: route.direction_destinations.get(idx).cloned().flatten(),
            id: direction_id,
        }
    }
}
