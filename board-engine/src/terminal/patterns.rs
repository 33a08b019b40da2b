//! Route patterns at a stop, grouped by what a rider sees: route,
//! direction and headsign.

use std::collections::{HashMap, HashSet};

use crate::domain::{
    EasternTime, RouteId, RoutePattern, RoutePatternId, Stop, StopId, Trip, TripId, Typicality,
};
use crate::global::{GlobalData, StopFamily};
use crate::realtime::{Alert, Effect, PredictionsResponse, ScheduleResponse};

/// Patterns at one stop that share route, direction and headsign.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PatternGrouping {
    pub route_id: RouteId,
    pub direction_id: u8,
    pub headsign: String,
    pub patterns: Vec<RoutePattern>,
}

impl PatternGrouping {
    pub fn pattern_ids(&self) -> impl Iterator<Item = &RoutePatternId> {
        self.patterns.iter().map(|p| &p.id)
    }
}

/// Every pattern grouping at one station.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StopPatterns {
    pub stop: Stop,
    /// The station and its children, sorted.
    pub stop_ids: Vec<StopId>,
    pub groupings: Vec<PatternGrouping>,
}

impl StopPatterns {
    /// Group `patterns` at `family` by route, direction and representative
    /// headsign, in pattern order.
    pub fn group(global: &GlobalData, family: &StopFamily, patterns: &[&RoutePattern]) -> Self {
        let mut sorted: Vec<&RoutePattern> = patterns.to_vec();
        sorted.sort();

        let mut groupings: Vec<PatternGrouping> = Vec::new();
        for pattern in sorted {
            let headsign = global.pattern_headsign(pattern).unwrap_or_default();
            match groupings.iter_mut().find(|g| {
                g.route_id == pattern.route_id
                    && g.direction_id == pattern.direction_id
                    && g.headsign == headsign
            }) {
                Some(grouping) => grouping.patterns.push(pattern.clone()),
                None => groupings.push(PatternGrouping {
                    route_id: pattern.route_id.clone(),
                    direction_id: pattern.direction_id,
                    headsign: headsign.to_string(),
                    patterns: vec![pattern.clone()],
                }),
            }
        }

        let mut stop_ids: Vec<StopId> = family.stop_ids.iter().cloned().collect();
        stop_ids.sort();
        Self {
            stop: family.stop.clone(),
            stop_ids,
            groupings,
        }
    }

    pub fn routes(&self) -> HashSet<&RouteId> {
        self.groupings.iter().map(|g| &g.route_id).collect()
    }
}

/// True if `subsequence` appears in `list` as a contiguous run.
///
/// Assumes `list` has no duplicates.
pub fn contains_subsequence<T: PartialEq>(list: &[T], subsequence: &[T]) -> bool {
    let Some(first) = subsequence.first() else {
        return true;
    };
    let Some(start) = list.iter().position(|x| x == first) else {
        return false;
    };
    list.get(start..start + subsequence.len())
        .is_some_and(|run| run == subsequence)
}

/// The pattern of a realtime trip, falling back to the static trip.
fn pattern_of<'a>(
    global: &'a GlobalData,
    trips: &'a HashMap<TripId, Trip>,
    trip_id: &TripId,
) -> Option<&'a RoutePatternId> {
    trips
        .get(trip_id)
        .or_else(|| global.trips.get(trip_id))
        .and_then(|t| t.route_pattern_id.as_ref())
}

/// Which route patterns are on today's schedule and in live predictions,
/// and which routes have an active suspension or shuttle.
pub struct RouteActivity<'a> {
    pub global: &'a GlobalData,
    scheduled: HashMap<&'a RouteId, HashSet<&'a RoutePatternId>>,
    predicted: HashMap<&'a RouteId, Vec<(&'a TripId, &'a StopId, Option<&'a RoutePattern>)>>,
    prediction_trips: &'a HashMap<TripId, Trip>,
    disrupted: Vec<&'a Alert>,
}

impl<'a> RouteActivity<'a> {
    pub fn new(
        global: &'a GlobalData,
        schedules: &'a ScheduleResponse,
        predictions: &'a PredictionsResponse,
        alerts: &[&'a Alert],
        now: EasternTime,
    ) -> Self {
        let mut scheduled: HashMap<&RouteId, HashSet<&RoutePatternId>> = HashMap::new();
        for schedule in &schedules.schedules {
            if let Some(pattern_id) = pattern_of(global, &schedules.trips, &schedule.trip_id) {
                scheduled
                    .entry(&schedule.route_id)
                    .or_default()
                    .insert(pattern_id);
            }
        }

        let mut predicted: HashMap<&RouteId, Vec<_>> = HashMap::new();
        for prediction in predictions.predictions.iter().filter(|p| !p.is_cancelled()) {
            let pattern = pattern_of(global, &predictions.trips, &prediction.trip_id)
                .and_then(|id| global.route_patterns.get(id));
            predicted.entry(&prediction.route_id).or_default().push((
                &prediction.trip_id,
                &prediction.stop_id,
                pattern,
            ));
        }

        let disrupted = alerts
            .iter()
            .copied()
            .filter(|a| {
                matches!(a.effect, Effect::Suspension | Effect::Shuttle) && a.is_active(now)
            })
            .collect();

        Self {
            global,
            scheduled,
            predicted,
            prediction_trips: &predictions.trips,
            disrupted,
        }
    }

    pub fn is_scheduled(&self, pattern: &RoutePattern) -> bool {
        self.scheduled
            .get(&pattern.route_id)
            .is_some_and(|ids| ids.contains(&pattern.id))
    }

    pub fn is_predicted(&self, pattern: &RoutePattern) -> bool {
        self.predictions_for(&pattern.route_id)
            .any(|(_, _, p)| p.is_some_and(|p| p.id == pattern.id))
    }

    /// Non-cancelled predictions on a route, with their trip's pattern.
    pub fn predictions_for(
        &self,
        route_id: &RouteId,
    ) -> impl Iterator<Item = (&'a TripId, &'a StopId, Option<&'a RoutePattern>)> {
        self.predicted.get(route_id).into_iter().flatten().copied()
    }

    pub fn prediction_trip(&self, trip_id: &TripId) -> Option<&'a Trip> {
        self.prediction_trips
            .get(trip_id)
            .or_else(|| self.global.trips.get(trip_id))
    }

    pub fn has_disruption_alert(&self, route_id: &RouteId) -> bool {
        self.disrupted
            .iter()
            .any(|a| a.any_informed_entity(|e| e.applies_to(None, Some(route_id), None, None)))
    }

    /// The route is rail, has an active disruption alert, runs a scheduled
    /// diversion and is missing a typical pattern from the schedule.
    pub fn schedule_replaced_typical(&self, route_id: &RouteId) -> bool {
        let Some(route) = self.global.routes.get(route_id) else {
            return false;
        };
        if !route.route_type.is_rail() || !self.has_disruption_alert(route_id) {
            return false;
        }
        let patterns = self.global.patterns_for_route(route_id);
        let diversion_scheduled = patterns
            .iter()
            .any(|p| p.typicality == Typicality::Diversion && self.is_scheduled(p));
        let typical_missing = patterns
            .iter()
            .any(|p| p.is_typical() && !self.is_scheduled(p));
        diversion_scheduled && typical_missing
    }

    /// `candidate` is a non-typical pattern in the same direction as
    /// `full` whose stops include `stop_id` and run contiguously along
    /// `full`.
    pub fn is_truncation_of(
        &self,
        candidate: &RoutePattern,
        full: &RoutePattern,
        full_stop_ids: &[StopId],
        stop_id: &StopId,
    ) -> bool {
        if candidate.is_typical() || candidate.direction_id != full.direction_id {
            return false;
        }
        let Some(candidate_stops) = self.global.pattern_stop_ids(candidate) else {
            return false;
        };
        candidate_stops.contains(stop_id) && contains_subsequence(full_stop_ids, candidate_stops)
    }
}

/// A heavy rail route `r` through stops `a`-`d`, disrupted beyond `b`.
///
/// Patterns serving `b`, all direction 0:
/// - `typ` (Typical, "D"): a, b, c, d
/// - `div` (Diversion, "B"): a, b
/// - `odd` (Atypical, "X"): b, x
///
/// Each pattern has a realtime trip `{pattern}-1`.
#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::HashMap;

    use super::*;
    use crate::display::trip_display::fixtures::{now, prediction, schedule};
    use crate::domain::RouteType;
    use crate::global::fixtures::{GlobalBuilder, stop_id};
    use crate::realtime::alert::fixtures::{ALL, alert, entity};
    use chrono::Duration;

    pub fn global() -> GlobalData {
        let mut b = GlobalBuilder::new();
        for s in ["a", "b", "c", "d", "x"] {
            b.stop(s, 0.0, 0.0);
        }
        b.route("r", RouteType::HeavyRail, 1);
        let typ = b.pattern("typ", "r", 0, Typicality::Typical, 1, "D", &["a", "b", "c", "d"]);
        let div = b.pattern("div", "r", 0, Typicality::Diversion, 2, "B", &["a", "b"]);
        let odd = b.pattern("odd", "r", 0, Typicality::Atypical, 3, "X", &["b", "x"]);
        for p in [&typ, &div, &odd] {
            b.trip(&format!("{}-1", p.id.as_str()), p);
        }
        b.build()
    }

    pub fn stop_patterns(global: &GlobalData) -> StopPatterns {
        let family = &global.resolved_parent_to_all_stops(&[stop_id("b")])[0];
        StopPatterns::group(global, family, &global.patterns_at_family(family))
    }

    /// One schedule at `b` ten minutes out for each named pattern's trip.
    pub fn schedules(patterns: &[&str]) -> ScheduleResponse {
        let at = Some(now() + Duration::minutes(10));
        ScheduleResponse::new(
            patterns
                .iter()
                .map(|p| schedule(&format!("{p}-1"), "b", at))
                .collect(),
            HashMap::new(),
        )
    }

    /// One prediction at `b` five minutes out for each named pattern's trip.
    pub fn predictions(patterns: &[&str]) -> PredictionsResponse {
        let at = Some(now() + Duration::minutes(5));
        PredictionsResponse::new(
            patterns
                .iter()
                .map(|p| prediction(&format!("{p}-1"), "b", at))
                .collect(),
            HashMap::new(),
            HashMap::new(),
        )
    }

    /// A shuttle between `c` and `d`.
    pub fn shuttle() -> Alert {
        alert(
            "shuttle",
            Effect::Shuttle,
            vec![
                entity(ALL, Some("r"), None, Some("c")),
                entity(ALL, Some("r"), None, Some("d")),
            ],
        )
    }

    pub fn headsigns(stop_patterns: &StopPatterns) -> Vec<&str> {
        stop_patterns
            .groupings
            .iter()
            .map(|g| g.headsign.as_str())
            .collect()
    }
}
