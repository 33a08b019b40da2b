//! The route card tree: line or route, then stop, then direction.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Duration;

use crate::config::EngineConfig;
use crate::domain::{
    Direction, DomainError, EasternTime, Line, Position, Route, RouteId, RoutePattern,
    RoutePatternId, RouteType, Stop, StopId, TripId,
};
use crate::display::UpcomingTrip;
use crate::global::GlobalData;
use crate::realtime::{Alert, AlertSignificance, Effect};

/// Where a board is being shown. Decides which patterns, trips and alerts
/// make the cut.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Context {
    NearbyTransit,
    StopDetailsFiltered,
    StopDetailsUnfiltered,
    Favorites,
}

impl Context {
    pub fn is_stop_details(&self) -> bool {
        matches!(
            self,
            Context::StopDetailsFiltered | Context::StopDetailsUnfiltered
        )
    }

    /// How far ahead a non-typical pattern's trips keep it on the board.
    /// `None` shows non-typical patterns whenever they have trips.
    pub fn non_typical_horizon(&self, config: &EngineConfig) -> Option<Duration> {
        match self {
            Context::NearbyTransit | Context::StopDetailsUnfiltered => {
                Some(config.non_typical_horizon())
            }
            Context::StopDetailsFiltered | Context::Favorites => None,
        }
    }

    /// Cancelled trips are only worth showing where a rider has drilled
    /// into one route at one stop.
    pub fn hides_cancellations(&self) -> bool {
        matches!(
            self,
            Context::NearbyTransit | Context::StopDetailsUnfiltered
        )
    }

    /// Least significant alert worth attaching to a leaf.
    pub fn alert_threshold(&self) -> AlertSignificance {
        if self.is_stop_details() {
            AlertSignificance::Minor
        } else {
            AlertSignificance::Accessibility
        }
    }
}

/// The routes of a grouped line, ordered by route.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GroupedLine {
    pub line: Line,
    routes: Vec<Route>,
}

impl GroupedLine {
    /// `None` when `routes` is empty.
    pub fn new(line: Line, mut routes: Vec<Route>) -> Option<Self> {
        if routes.is_empty() {
            return None;
        }
        routes.sort();
        routes.dedup_by(|a, b| a.id == b.id);
        Some(Self { line, routes })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

/// What a route card is headed by.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LineOrRoute {
    Line(GroupedLine),
    Route(Route),
}

impl LineOrRoute {
    pub fn id(&self) -> &str {
        match self {
            LineOrRoute::Line(grouped) => grouped.line.id.as_str(),
            LineOrRoute::Route(route) => route.id.as_str(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LineOrRoute::Line(grouped) => &grouped.line.long_name,
            LineOrRoute::Route(route) => route.label(),
        }
    }

    /// The route whose sort order and mode stand for the card.
    pub fn sort_route(&self) -> &Route {
        match self {
            // GroupedLine::new rejects empty route lists
            LineOrRoute::Line(grouped) => &grouped.routes[0],
            LineOrRoute::Route(route) => route,
        }
    }

    pub fn route_type(&self) -> RouteType {
        self.sort_route().route_type
    }

    pub fn all_routes(&self) -> &[Route] {
        match self {
            LineOrRoute::Line(grouped) => grouped.routes(),
            LineOrRoute::Route(route) => std::slice::from_ref(route),
        }
    }

    pub fn route_ids(&self) -> Vec<RouteId> {
        self.all_routes().iter().map(|r| r.id.clone()).collect()
    }

    pub fn is_subway(&self) -> bool {
        self.all_routes().iter().any(|r| r.route_type.is_subway())
    }

    pub fn contains_route(&self, route_id: &RouteId) -> bool {
        self.all_routes().iter().any(|r| &r.id == route_id)
    }

    /// Directions served at a stop by `patterns`, named after the route of
    /// the first pattern in each direction.
    pub fn directions(&self, patterns: &[RoutePattern]) -> Vec<Direction> {
        let mut by_id: BTreeMap<u8, Direction> = BTreeMap::new();
        for pattern in patterns {
            let route = self
                .all_routes()
                .iter()
                .find(|r| r.id == pattern.route_id)
                .unwrap_or(self.sort_route());
            by_id
                .entry(pattern.direction_id)
                .or_insert_with(|| route.direction(pattern.direction_id));
        }
        by_id.into_values().collect()
    }
}

/// Service for one line or route at a set of stops.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RouteCard {
    pub line_or_route: LineOrRoute,
    pub stop_data: Vec<RouteStopData>,
    pub at: EasternTime,
}

impl RouteCard {
    pub fn id(&self) -> &str {
        self.line_or_route.id()
    }

    /// Distance from `position` to the card's first stop.
    pub fn distance_from(&self, position: &Position) -> Option<f64> {
        self.stop_data
            .first()
            .map(|data| data.stop.distance_from(position))
    }
}

/// One stop on a route card.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RouteStopData {
    pub line_or_route: LineOrRoute,
    pub stop: Stop,
    pub directions: Vec<Direction>,
    pub data: Vec<Leaf>,
}

impl RouteStopData {
    pub fn id(&self) -> &StopId {
        &self.stop.id
    }

    pub fn available_directions(&self) -> BTreeSet<u8> {
        self.data.iter().map(|leaf| leaf.direction_id).collect()
    }

    pub fn elevator_alerts(&self) -> Vec<&Alert> {
        let mut seen = HashSet::new();
        self.data
            .iter()
            .flat_map(|leaf| leaf.alerts_here(None))
            .filter(|a| a.effect == Effect::ElevatorClosure && seen.insert(&a.id))
            .collect()
    }
}

/// One direction at one stop: the patterns that run there, their upcoming
/// trips and the alerts that touch them.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Leaf {
    pub line_or_route: LineOrRoute,
    pub stop: Stop,
    pub direction_id: u8,
    pub route_patterns: Vec<RoutePattern>,
    /// The stop and those of its children served by `route_patterns`.
    pub stop_ids: HashSet<StopId>,
    pub upcoming_trips: Vec<UpcomingTrip>,
    alerts_here: Vec<Alert>,
    pub all_data_loaded: bool,
    pub has_schedules_today_by_pattern: BTreeMap<RoutePatternId, bool>,
    alerts_downstream: Vec<Alert>,
    pub context: Context,
}

impl Leaf {
    /// Assemble a leaf.
    ///
    /// Returns an error if the leaf has trips but no route patterns, since
    /// nothing could then name the service the trips belong to.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        line_or_route: LineOrRoute,
        stop: Stop,
        direction_id: u8,
        route_patterns: Vec<RoutePattern>,
        stop_ids: HashSet<StopId>,
        upcoming_trips: Vec<UpcomingTrip>,
        alerts_here: Vec<Alert>,
        all_data_loaded: bool,
        has_schedules_today_by_pattern: BTreeMap<RoutePatternId, bool>,
        alerts_downstream: Vec<Alert>,
        context: Context,
    ) -> Result<Self, DomainError> {
        if route_patterns.is_empty() && !upcoming_trips.is_empty() {
            return Err(DomainError::LeafWithoutPatterns {
                stop: stop.id.clone(),
                direction_id,
            });
        }
        Ok(Self {
            line_or_route,
            stop,
            direction_id,
            route_patterns,
            stop_ids,
            upcoming_trips,
            alerts_here,
            all_data_loaded,
            has_schedules_today_by_pattern,
            alerts_downstream,
            context,
        })
    }

    pub fn has_schedules_today(&self) -> bool {
        self.has_schedules_today_by_pattern.values().any(|&has| has)
    }

    pub(crate) fn major_alert(&self) -> Option<&Alert> {
        self.alerts_here
            .iter()
            .find(|a| a.significance() >= AlertSignificance::Major)
    }

    /// The first non-major alert worth flagging here, else the first alert
    /// further down the line.
    pub(crate) fn secondary_alert(&self) -> Option<&Alert> {
        self.alerts_here
            .iter()
            .find(|a| {
                let significance = a.significance();
                (AlertSignificance::Secondary..AlertSignificance::Major).contains(&significance)
            })
            .or(self.alerts_downstream.first())
    }

    /// Alerts at this stop, optionally only those naming `trip_id`.
    pub fn alerts_here(&self, trip_id: Option<&TripId>) -> Vec<&Alert> {
        filter_by_trip(&self.alerts_here, trip_id)
    }

    /// Alerts further along the leaf's patterns.
    pub fn alerts_downstream(&self, trip_id: Option<&TripId>) -> Vec<&Alert> {
        filter_by_trip(&self.alerts_downstream, trip_id)
    }

    pub fn min_pattern_sort_order(&self) -> Option<i32> {
        self.route_patterns.iter().map(|p| p.sort_order).min()
    }

    /// True if the leaf has something to show right now. An alert counts
    /// as much as a trip.
    pub fn has_service(&self) -> bool {
        !self.upcoming_trips.is_empty()
            || !self.alerts_here.is_empty()
            || !self.alerts_downstream.is_empty()
    }

    pub(crate) fn route<'g>(
        &self,
        global: &'g GlobalData,
        route_id: &RouteId,
    ) -> Option<&'g Route> {
        match self.line_or_route {
            LineOrRoute::Line(_) => global.routes.get(route_id),
            LineOrRoute::Route(_) => None,
        }
    }
}

/// The members of `local` that `patterns` actually stop at, or all of
/// `local` when none of them are.
pub fn filter_stops_by_patterns(
    patterns: &[&RoutePattern],
    global: &GlobalData,
    local: &HashSet<StopId>,
) -> HashSet<StopId> {
    let served: HashSet<StopId> = patterns
        .iter()
        .filter_map(|p| global.pattern_stop_ids(p))
        .flatten()
        .filter(|s| local.contains(*s))
        .cloned()
        .collect();
    if served.is_empty() {
        local.clone()
    } else {
        served
    }
}

fn filter_by_trip<'a>(alerts: &'a [Alert], trip_id: Option<&TripId>) -> Vec<&'a Alert> {
    alerts
        .iter()
        .filter(|a| trip_id.is_none() || a.any_entity_satisfies(|p| p.check_trip(trip_id)))
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A leaf with no trips or alerts and every pattern unscheduled.
    pub fn leaf(
        line_or_route: LineOrRoute,
        stop: Stop,
        direction_id: u8,
        patterns: Vec<RoutePattern>,
    ) -> Leaf {
        let stop_ids = HashSet::from([stop.id.clone()]);
        let has_schedules = patterns.iter().map(|p| (p.id.clone(), false)).collect();
        Leaf::new(
            line_or_route,
            stop,
            direction_id,
            patterns,
            stop_ids,
            Vec::new(),
            Vec::new(),
            true,
            has_schedules,
            Vec::new(),
            Context::NearbyTransit,
        )
        .unwrap()
    }

    pub fn with_trips(mut leaf: Leaf, trips: Vec<UpcomingTrip>) -> Leaf {
        leaf.upcoming_trips = trips;
        leaf
    }

    pub fn with_alerts(mut leaf: Leaf, here: Vec<Alert>, downstream: Vec<Alert>) -> Leaf {
        leaf.alerts_here = here;
        leaf.alerts_downstream = downstream;
        leaf
    }
}
