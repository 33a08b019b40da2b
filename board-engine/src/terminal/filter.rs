//! Hides the stale half of a disrupted route at a temporary terminal.
//!
//! When a shuttle or suspension cuts a rail line short, the schedule feed
//! usually switches to a diversion pattern that stops at the temporary
//! terminal, while the typical pattern lingers in static data with nothing
//! running on it. Showing both gives riders a dead row next to the real one.

use crate::domain::{RouteId, RoutePattern, StopId, Typicality};

use super::patterns::{PatternGrouping, RouteActivity, StopPatterns};

/// Drops groupings at a stop that the current disruption makes meaningless.
pub struct TemporaryTerminalFilter<'a, 'b> {
    activity: &'b RouteActivity<'a>,
}

impl<'a, 'b> TemporaryTerminalFilter<'a, 'b> {
    pub fn new(activity: &'b RouteActivity<'a>) -> Self {
        Self { activity }
    }

    /// True when the route's schedule has swapped a typical pattern for a
    /// diversion under an active disruption, and no live trip is yet
    /// running the diversion.
    ///
    /// All of the following must hold:
    /// 1. The route is rail
    /// 2. An active suspension or shuttle alert informs the route
    /// 3. A diversion pattern of the route is scheduled
    /// 4. Some typical pattern of the route is not scheduled
    /// 5. No non-cancelled prediction runs on a diversion pattern
    pub fn applies_to_route(&self, route_id: &RouteId) -> bool {
        self.activity.schedule_replaced_typical(route_id)
            && !self
                .activity
                .predictions_for(route_id)
                .any(|(_, _, p)| p.is_some_and(|p| p.typicality == Typicality::Diversion))
    }

    /// Remove groupings of affected routes that a rider should not see.
    ///
    /// A grouping is dropped when either:
    /// - its patterns are all typical, unscheduled and unpredicted, and a
    ///   scheduled diversion at the stop truncates one of them here
    /// - its patterns are all non-typical, scheduled and unpredicted, and
    ///   none of them truncates a typical pattern of the route here
    pub fn filter_patterns_at_stop(&self, mut stop_patterns: StopPatterns) -> StopPatterns {
        let diversions: Vec<&RoutePattern> = stop_patterns
            .groupings
            .iter()
            .flat_map(|g| &g.patterns)
            .filter(|p| p.typicality == Typicality::Diversion && self.activity.is_scheduled(p))
            .collect();

        let keep: Vec<bool> = stop_patterns
            .groupings
            .iter()
            .map(|g| {
                !self.applies_to_route(&g.route_id)
                    || !(self.replaced_typical(g, &diversions, &stop_patterns.stop_ids)
                        || self.unrelated_non_typical(g, &stop_patterns.stop_ids))
            })
            .collect();

        let before = stop_patterns.groupings.len();
        let mut keep = keep.into_iter();
        stop_patterns
            .groupings
            .retain(|_| keep.next().unwrap_or(true));
        if stop_patterns.groupings.len() != before {
            tracing::debug!(
                stop = %stop_patterns.stop.id,
                dropped = before - stop_patterns.groupings.len(),
                "filtered temporary terminal groupings"
            );
        }
        stop_patterns
    }

    fn idle(&self, pattern: &RoutePattern) -> bool {
        !self.activity.is_scheduled(pattern) && !self.activity.is_predicted(pattern)
    }

    fn replaced_typical(
        &self,
        grouping: &PatternGrouping,
        diversions: &[&RoutePattern],
        stop_ids: &[StopId],
    ) -> bool {
        if !grouping.patterns.iter().all(|p| p.is_typical() && self.idle(p)) {
            return false;
        }
        grouping.patterns.iter().any(|full| {
            let Some(full_stops) = self.activity.global.pattern_stop_ids(full) else {
                return false;
            };
            diversions.iter().any(|d| {
                d.route_id == full.route_id
                    && stop_ids
                        .iter()
                        .any(|s| self.activity.is_truncation_of(d, full, full_stops, s))
            })
        })
    }

    fn unrelated_non_typical(&self, grouping: &PatternGrouping, stop_ids: &[StopId]) -> bool {
        let all_scheduled_only = grouping.patterns.iter().all(|p| {
            !p.is_typical() && self.activity.is_scheduled(p) && !self.activity.is_predicted(p)
        });
        if !all_scheduled_only {
            return false;
        }
        // Typical patterns come from static data rather than the groupings
        // so that a first pass dropping them cannot change this answer.
        let global = self.activity.global;
        let typical: Vec<&RoutePattern> = global
            .patterns_for_route(&grouping.route_id)
            .into_iter()
            .filter(|p| p.is_typical())
            .collect();
        !grouping.patterns.iter().any(|candidate| {
            typical.iter().any(|full| {
                global.pattern_stop_ids(full).is_some_and(|full_stops| {
                    stop_ids
                        .iter()
                        .any(|s| self.activity.is_truncation_of(candidate, full, full_stops, s))
                })
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::patterns::fixtures::*;
    use super::*;
    use crate::display::trip_display::fixtures::now;
    use crate::global::fixtures::route_id;
    use crate::realtime::{Alert, ScheduleRelationship};

    fn filtered(schedules: &[&str], predictions: &[&str], alerts: &[Alert]) -> Vec<String> {
        let global = global();
        let schedules = super::super::patterns::fixtures::schedules(schedules);
        let predictions = super::super::patterns::fixtures::predictions(predictions);
        let alerts: Vec<&Alert> = alerts.iter().collect();
        let activity = RouteActivity::new(&global, &schedules, &predictions, &alerts, now());
        let filter = TemporaryTerminalFilter::new(&activity);
        let result = filter.filter_patterns_at_stop(stop_patterns(&global));
        headsigns(&result).into_iter().map(String::from).collect()
    }

    #[test]
    fn applies_only_under_full_conditions() {
        let global = global();
        let shuttle = shuttle();
        let alerts = vec![&shuttle];
        let check = |scheduled: &[&str], predicted: &[&str], alerts: &[&Alert]| {
            let schedules = super::super::patterns::fixtures::schedules(scheduled);
            let predictions = super::super::patterns::fixtures::predictions(predicted);
            let activity = RouteActivity::new(&global, &schedules, &predictions, alerts, now());
            TemporaryTerminalFilter::new(&activity).applies_to_route(&route_id("r"))
        };

        assert!(check(&["div"], &[], &alerts));
        assert!(check(&["div"], &["typ"], &alerts));
        assert!(!check(&["div"], &[], &[]), "needs a disruption alert");
        assert!(!check(&["typ"], &[], &alerts), "needs a scheduled diversion");
        assert!(!check(&["div", "typ"], &[], &alerts), "typical still scheduled");
        assert!(!check(&["div"], &["div"], &alerts), "diversion already live");
    }

    #[test]
    fn cancelled_diversion_prediction_does_not_block() {
        let global = global();
        let shuttle = shuttle();
        let schedules = super::super::patterns::fixtures::schedules(&["div"]);
        let mut predictions = super::super::patterns::fixtures::predictions(&["div"]);
        predictions.predictions[0].schedule_relationship = ScheduleRelationship::Cancelled;
        let activity = RouteActivity::new(&global, &schedules, &predictions, &[&shuttle], now());
        assert!(TemporaryTerminalFilter::new(&activity).applies_to_route(&route_id("r")));
    }

    #[test]
    fn drops_idle_typical_replaced_by_diversion() {
        assert_eq!(filtered(&["div"], &[], &[shuttle()]), vec!["B", "X"]);
    }

    #[test]
    fn keeps_typical_with_live_prediction() {
        assert_eq!(filtered(&["div"], &["typ"], &[shuttle()]), vec!["D", "B", "X"]);
    }

    #[test]
    fn drops_scheduled_non_typical_unrelated_to_typical() {
        assert_eq!(filtered(&["div", "odd"], &[], &[shuttle()]), vec!["B"]);
    }

    #[test]
    fn keeps_predicted_non_typical() {
        assert_eq!(filtered(&["div", "odd"], &["odd"], &[shuttle()]), vec!["B", "X"]);
    }

    #[test]
    fn untouched_without_disruption() {
        assert_eq!(filtered(&["div"], &[], &[]), vec!["D", "B", "X"]);
    }

    #[test]
    fn idempotent_after_typical_is_dropped() {
        let global = global();
        let shuttle = shuttle();
        let schedules = super::super::patterns::fixtures::schedules(&["div", "odd"]);
        let predictions = super::super::patterns::fixtures::predictions(&[]);
        let activity = RouteActivity::new(&global, &schedules, &predictions, &[&shuttle], now());
        let filter = TemporaryTerminalFilter::new(&activity);

        let once = filter.filter_patterns_at_stop(stop_patterns(&global));
        let twice = filter.filter_patterns_at_stop(once.clone());
        assert_eq!(once, twice);
    }
}
