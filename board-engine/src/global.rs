//! The static reference snapshot.
//!
//! [`GlobalData`] is loaded wholesale and replaced atomically on refresh.
//! It is never mutated in place once handed to the engine.

use std::collections::{HashMap, HashSet};

use crate::config::EngineConfig;
use crate::domain::{
    DomainError, Line, LineId, Route, RouteId, RoutePattern, RoutePatternId, Shape, ShapeId, Stop,
    StopId, Trip, TripId,
};

/// Routes, lines, stops, patterns, trips and shapes keyed by id.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GlobalData {
    pub stops: HashMap<StopId, Stop>,
    pub routes: HashMap<RouteId, Route>,
    pub lines: HashMap<LineId, Line>,
    pub route_patterns: HashMap<RoutePatternId, RoutePattern>,
    pub trips: HashMap<TripId, Trip>,
    pub shapes: HashMap<ShapeId, Shape>,
    /// Route patterns serving each stop (platform-level ids).
    pub pattern_ids_by_stop: HashMap<StopId, Vec<RoutePatternId>>,
}

/// A stop requested by the caller, resolved to its parent station, with the
/// full family of ids (parent and children) to match realtime data against.
#[derive(Debug, Clone, PartialEq)]
pub struct StopFamily {
    pub stop: Stop,
    pub stop_ids: HashSet<StopId>,
}

impl GlobalData {
    /// Check the stop hierarchy for dangling references.
    pub fn validate(&self) -> Result<(), DomainError> {
        for stop in self.stops.values() {
            if let Some(parent_id) = &stop.parent_station_id
                && !self.stops.contains_key(parent_id)
            {
                return Err(DomainError::DanglingParent {
                    stop: stop.id.clone(),
                    parent: parent_id.clone(),
                });
            }
            for child_id in &stop.child_stop_ids {
                if let Some(child) = self.stops.get(child_id)
                    && child.parent_station_id.as_ref() != Some(&stop.id)
                {
                    return Err(DomainError::MismatchedChild {
                        parent: stop.id.clone(),
                        child: child_id.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve a stop id to its parent station (or itself).
    pub fn parent_stop(&self, stop_id: &StopId) -> Option<&Stop> {
        self.stops
            .get(stop_id)
            .map(|stop| stop.resolve_parent(&self.stops))
    }

    /// Resolve a stop id to its parent station id, keeping unknown ids as-is.
    pub fn resolve_parent_id(&self, stop_id: &StopId) -> StopId {
        self.parent_stop(stop_id)
            .map(|stop| stop.id.clone())
            .unwrap_or_else(|| stop_id.clone())
    }

    /// Route patterns serving `stop_id` directly.
    pub fn patterns_at_stop(&self, stop_id: &StopId) -> Vec<&RoutePattern> {
        self.pattern_ids_by_stop
            .get(stop_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.route_patterns.get(id))
            .collect()
    }

    /// Route patterns serving any member of a stop family, deduplicated and
    /// sorted.
    pub fn patterns_at_family(&self, family: &StopFamily) -> Vec<&RoutePattern> {
        let mut seen = HashSet::new();
        let mut patterns: Vec<&RoutePattern> = family
            .stop_ids
            .iter()
            .flat_map(|id| self.patterns_at_stop(id))
            .filter(|p| seen.insert(&p.id))
            .collect();
        patterns.sort();
        patterns
    }

    /// All route patterns of a route.
    pub fn patterns_for_route(&self, route_id: &RouteId) -> Vec<&RoutePattern> {
        let mut patterns: Vec<_> = self
            .route_patterns
            .values()
            .filter(|p| &p.route_id == route_id)
            .collect();
        patterns.sort();
        patterns
    }

    /// Routes belonging to a line, in route order.
    pub fn routes_for_line(&self, line_id: &LineId) -> Vec<&Route> {
        let mut routes: Vec<_> = self
            .routes
            .values()
            .filter(|r| r.line_id.as_ref() == Some(line_id))
            .collect();
        routes.sort();
        routes
    }

    /// The line a route's departures are grouped under, if any.
    ///
    /// Shuttle routes are never grouped, and only configured lines group.
    pub fn grouping_line(&self, route_id: &RouteId, config: &EngineConfig) -> Option<&Line> {
        let route = self.routes.get(route_id)?;
        if route.is_shuttle() {
            return None;
        }
        let line_id = route.line_id.as_ref()?;
        if !config.is_grouped_line(line_id) {
            return None;
        }
        self.lines.get(line_id)
    }

    /// Headsign of a pattern's representative trip.
    pub fn pattern_headsign(&self, pattern: &RoutePattern) -> Option<&str> {
        self.trips
            .get(&pattern.representative_trip_id)
            .map(|t| t.headsign.as_str())
    }

    /// Stop list of a pattern's representative trip.
    pub fn pattern_stop_ids(&self, pattern: &RoutePattern) -> Option<&[StopId]> {
        self.trips
            .get(&pattern.representative_trip_id)
            .map(|t| t.stop_ids.as_slice())
    }

    /// Resolve the requested stops to parent stations, preserving the order
    /// in which each parent first appears.
    ///
    /// Each family contains the parent and all of its children, so realtime
    /// data reported against any platform lands on the station.
    pub fn resolved_parent_to_all_stops(&self, stop_ids: &[StopId]) -> Vec<StopFamily> {
        let mut families: Vec<StopFamily> = Vec::new();
        for stop_id in stop_ids {
            let Some(parent) = self.parent_stop(stop_id) else {
                continue;
            };
            if families.iter().any(|f| f.stop.id == parent.id) {
                continue;
            }
            let mut ids: HashSet<StopId> = parent
                .child_stop_ids
                .iter()
                .filter(|id| self.stops.contains_key(*id))
                .cloned()
                .collect();
            ids.insert(parent.id.clone());
            families.push(StopFamily {
                stop: parent.clone(),
                stop_ids: ids,
            });
        }
        families
    }
}
