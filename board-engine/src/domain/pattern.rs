//! Route patterns.

use std::cmp::Ordering;

use super::{RouteId, RoutePatternId, TripId};

/// How commonly a route pattern actually runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Typicality {
    /// Shown under normal conditions.
    Typical,
    /// A rare or seasonal variant.
    Atypical,
    /// A live reroute around a disruption.
    Diversion,
    /// Exists only to carry shape metadata.
    CanonicalOnly,
}

/// One stop-sequence variant of a route, in one direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct RoutePattern {
    pub id: RoutePatternId,
    pub route_id: RouteId,
    pub direction_id: u8,
    #[serde(default)]
    pub name: String,
    pub typicality: Typicality,
    pub sort_order: i32,
    /// A trip whose stop list and headsign stand for the whole pattern.
    pub representative_trip_id: TripId,
}

impl RoutePattern {
    pub fn is_typical(&self) -> bool {
        self.typicality == Typicality::Typical
    }
}

impl Ord for RoutePattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_order
            .cmp(&other.sort_order)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for RoutePattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
