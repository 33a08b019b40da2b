//! Rewrites live trips onto the truncated pattern at a temporary terminal.
//!
//! Predictions often keep arriving on the typical pattern through a
//! disruption even though the schedule has moved to a diversion. The
//! rewriter works out which truncated pattern each typical pattern really
//! runs as at a stop, merges their groupings and relabels the predicted
//! trips so they show the temporary terminal as their headsign.

use std::collections::HashMap;

use crate::domain::{RouteId, RoutePattern, RoutePatternId, StopId, Trip, TripId};

use super::patterns::{PatternGrouping, RouteActivity, StopPatterns};

/// Truncated pattern each (typical pattern, stop) pair runs as.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Truncations(HashMap<(RoutePatternId, StopId), RoutePatternId>);

impl Truncations {
    pub fn get(&self, full: &RoutePatternId, stop_id: &StopId) -> Option<&RoutePatternId> {
        self.0.get(&(full.clone(), stop_id.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if `full` runs as a truncated pattern at any of `stop_ids`.
    pub fn truncates(&self, full: &RoutePatternId, stop_ids: &[StopId]) -> bool {
        stop_ids.iter().any(|s| self.get(full, s).is_some())
    }

    fn is_truncated(&self, pattern_id: &RoutePatternId) -> bool {
        self.0.values().any(|t| t == pattern_id)
    }

    /// The single truncated pattern `full` runs as at any of `stop_ids`,
    /// else `full` itself.
    fn effective<'p>(
        &'p self,
        full: &'p RoutePatternId,
        stop_ids: &[StopId],
    ) -> &'p RoutePatternId {
        let mapped: Vec<&RoutePatternId> = stop_ids
            .iter()
            .filter_map(|s| self.get(full, s))
            .collect();
        match mapped.as_slice() {
            [only] => *only,
            _ => full,
        }
    }
}

pub struct TemporaryTerminalRewriter<'a, 'b> {
    activity: &'b RouteActivity<'a>,
}

impl<'a, 'b> TemporaryTerminalRewriter<'a, 'b> {
    pub fn new(activity: &'b RouteActivity<'a>) -> Self {
        Self { activity }
    }

    /// True when the route's schedule has swapped a typical pattern for a
    /// diversion under an active disruption, but every live prediction
    /// still runs on a typical pattern.
    pub fn applies_to_route(&self, route_id: &RouteId) -> bool {
        if !self.activity.schedule_replaced_typical(route_id) {
            return false;
        }
        let mut predictions = self.activity.predictions_for(route_id).peekable();
        predictions.peek().is_some()
            && predictions.all(|(_, _, p)| p.is_some_and(RoutePattern::is_typical))
    }

    /// The pattern `full` is cut down to at `stop_id`.
    ///
    /// A lone plausible truncation wins outright; among several, only a
    /// single scheduled one does.
    pub fn truncated_pattern(
        &self,
        full: &RoutePattern,
        full_stop_ids: &[StopId],
        stop_id: &StopId,
    ) -> Option<&'a RoutePattern> {
        let candidates: Vec<&'a RoutePattern> = self
            .activity
            .global
            .patterns_for_route(&full.route_id)
            .into_iter()
            .filter(|c| self.activity.is_truncation_of(c, full, full_stop_ids, stop_id))
            .collect();
        match candidates.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => {
                let scheduled: Vec<&'a RoutePattern> = candidates
                    .iter()
                    .copied()
                    .filter(|c| self.activity.is_scheduled(c))
                    .collect();
                match scheduled.as_slice() {
                    [only] => Some(*only),
                    _ => None,
                }
            }
        }
    }

    /// Record truncations of the typical patterns at this stop and merge
    /// groupings that end up running the same patterns.
    ///
    /// The merged grouping keeps the truncated grouping's headsign and
    /// lists every pattern it absorbed, in pattern order.
    pub fn truncate_patterns_at_stop(
        &self,
        stop_patterns: StopPatterns,
        truncations: &mut Truncations,
    ) -> StopPatterns {
        let global = self.activity.global;
        for grouping in &stop_patterns.groupings {
            if !self.applies_to_route(&grouping.route_id) {
                continue;
            }
            for full in grouping.patterns.iter().filter(|p| p.is_typical()) {
                let Some(full_stops) = global.pattern_stop_ids(full) else {
                    continue;
                };
                for stop_id in &stop_patterns.stop_ids {
                    if let Some(truncated) = self.truncated_pattern(full, full_stops, stop_id) {
                        truncations
                            .0
                            .insert((full.id.clone(), stop_id.clone()), truncated.id.clone());
                    }
                }
            }
        }
        if truncations.is_empty() {
            return stop_patterns;
        }

        let StopPatterns {
            stop,
            stop_ids,
            groupings,
        } = stop_patterns;

        let mut keys: Vec<Vec<RoutePatternId>> = Vec::new();
        let mut by_key: HashMap<Vec<RoutePatternId>, Vec<PatternGrouping>> = HashMap::new();
        for grouping in groupings {
            let key: Vec<RoutePatternId> = grouping
                .pattern_ids()
                .map(|id| truncations.effective(id, &stop_ids).clone())
                .collect();
            by_key
                .entry(key.clone())
                .or_insert_with(|| {
                    keys.push(key);
                    Vec::new()
                })
                .push(grouping);
        }

        let groupings = keys
            .into_iter()
            .filter_map(|key| by_key.remove(&key))
            .filter_map(|group| collapse(group, &*truncations))
            .collect();

        StopPatterns {
            stop,
            stop_ids,
            groupings,
        }
    }

    /// Trips of live predictions on truncated patterns, relabelled with the
    /// truncated pattern and its headsign.
    pub fn rewrite_predictions(&self, truncations: &Truncations) -> HashMap<TripId, Trip> {
        let global = self.activity.global;
        let mut rewritten = HashMap::new();
        let routes: Vec<&RouteId> = global.routes.keys().collect();
        for route_id in routes {
            if !self.applies_to_route(route_id) {
                continue;
            }
            for (trip_id, stop_id, pattern) in self.activity.predictions_for(route_id) {
                let Some(truncated) = pattern
                    .and_then(|p| truncations.get(&p.id, stop_id))
                    .and_then(|id| global.route_patterns.get(id))
                else {
                    continue;
                };
                let Some(trip) = self.activity.prediction_trip(trip_id) else {
                    continue;
                };
                let headsign = global
                    .pattern_headsign(truncated)
                    .map_or_else(|| trip.headsign.clone(), str::to_string);
                rewritten.entry(trip_id.clone()).or_insert_with(|| Trip {
                    route_pattern_id: Some(truncated.id.clone()),
                    headsign,
                    ..trip.clone()
                });
            }
        }
        if !rewritten.is_empty() {
            tracing::debug!(trips = rewritten.len(), "rewrote trips to temporary terminals");
        }
        rewritten
    }
}

/// Merge groupings sharing an effective pattern list into one, led by the
/// grouping that holds a truncated pattern.
fn collapse(mut group: Vec<PatternGrouping>, truncations: &Truncations) -> Option<PatternGrouping> {
    if group.len() > 1 {
        group.sort_by_key(|g| !g.pattern_ids().any(|id| truncations.is_truncated(id)));
    }
    let mut group = group.into_iter();
    let mut merged = group.next()?;
    let mut absorbed = false;
    for other in group {
        merged.patterns.extend(other.patterns);
        absorbed = true;
    }
    if absorbed {
        merged.patterns.sort();
        merged.patterns.dedup_by(|a, b| a.id == b.id);
    }
    Some(merged)
}


#[cfg(test)]
mod proptests {
    use super::super::patterns::fixtures::*;
    use super::*;
    use crate::display::trip_display::fixtures::now;
    use crate::realtime::Alert;
    use proptest::prelude::*;

    const PATTERNS: [&str; 3] = ["typ", "div", "odd"];

    fn pick(mask: u8) -> Vec<&'static str> {
        PATTERNS
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1 << i) != 0)
            .map(|(_, p)| *p)
            .collect()
    }

    proptest! {
        #[test]
        fn truncating_is_idempotent(scheduled in 0u8..8, predicted in 0u8..8, disrupted: bool) {
            let global = global();
            let shuttle = shuttle();
            let alerts: Vec<&Alert> = if disrupted { vec![&shuttle] } else { vec![] };
            let schedules = schedules(&pick(scheduled));
            let predictions = predictions(&pick(predicted));
            let activity = RouteActivity::new(&global, &schedules, &predictions, &alerts, now());
            let rewriter = TemporaryTerminalRewriter::new(&activity);

            let mut truncations = Truncations::default();
            let once = rewriter.truncate_patterns_at_stop(stop_patterns(&global), &mut truncations);
            let twice = rewriter.truncate_patterns_at_stop(once.clone(), &mut truncations);
            prop_assert_eq!(once, twice);
        }
    }
}
