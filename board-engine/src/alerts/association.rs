//! Associating alerts with stops and computing per-stop service status.
//!
//! Alerts name stops at whatever level the author chose: a whole station,
//! one platform, or both. Riders look at stations, so the result is keyed by
//! top-level stop with per-platform detail underneath.

use std::collections::{BTreeMap, HashSet};

use crate::domain::{EasternTime, RoutePattern, Stop, StopId};
use crate::global::GlobalData;
use crate::realtime::Alert;

/// Whether trains or buses still serve a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopServiceStatus {
    Normal,
    PartialService,
    NoService,
}

/// The alerts affecting one stop, and for a station, its platforms.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct AlertAssociatedStop {
    pub stop: Stop,
    /// Alerts that name this stop. For a station, alerts that also show up
    /// on a platform are listed only under that platform.
    pub relevant_alerts: Vec<Alert>,
    /// Relevant alerts that stop service through the stop.
    pub service_alerts: Vec<Alert>,
    pub service_status: StopServiceStatus,
    /// Platforms with at least one relevant alert.
    pub child_alerts: BTreeMap<StopId, AlertAssociatedStop>,
}

impl AlertAssociatedStop {
    /// A stop no alert names.
    pub fn unaffected(stop: Stop) -> Self {
        Self {
            stop,
            relevant_alerts: Vec::new(),
            service_alerts: Vec::new(),
            service_status: StopServiceStatus::Normal,
            child_alerts: BTreeMap::new(),
        }
    }
}

/// Build the alert association for every top-level stop with alerts.
pub fn alerts_by_stop(
    global: &GlobalData,
    alerts: &[&Alert],
    now: EasternTime,
) -> BTreeMap<StopId, AlertAssociatedStop> {
    let active: Vec<&Alert> = alerts.iter().copied().filter(|a| a.is_active(now)).collect();
    if active.is_empty() {
        return BTreeMap::new();
    }

    let mut by_stop = BTreeMap::new();
    for stop in global.stops.values() {
        if stop
            .parent_station_id
            .as_ref()
            .is_some_and(|parent| global.stops.contains_key(parent))
        {
            continue;
        }
        if let Some(entry) = associate_station(global, stop, &active) {
            by_stop.insert(stop.id.clone(), entry);
        }
    }
    tracing::debug!(stops = by_stop.len(), alerts = active.len(), "associated alerts with stops");
    by_stop
}

fn associate_station(
    global: &GlobalData,
    stop: &Stop,
    alerts: &[&Alert],
) -> Option<AlertAssociatedStop> {
    let own = associate_leaf(global, stop, alerts);

    let children: Vec<(AlertAssociatedStop, bool)> = stop
        .child_stop_ids
        .iter()
        .filter_map(|id| global.stops.get(id))
        .map(|child| {
            let served = !global.patterns_at_stop(&child.id).is_empty();
            (associate_leaf(global, child, alerts), served)
        })
        .collect();

    let served_statuses: Vec<StopServiceStatus> = children
        .iter()
        .filter(|(_, served)| *served)
        .map(|(entry, _)| entry.service_status)
        .collect();

    let service_status = if served_statuses.is_empty() {
        own.service_status
    } else if served_statuses.iter().all(|s| *s == StopServiceStatus::NoService) {
        StopServiceStatus::NoService
    } else if served_statuses.iter().all(|s| *s == StopServiceStatus::Normal) {
        StopServiceStatus::Normal
    } else {
        StopServiceStatus::PartialService
    };

    let child_alerts: BTreeMap<StopId, AlertAssociatedStop> = children
        .into_iter()
        .map(|(entry, _)| entry)
        .filter(|entry| !entry.relevant_alerts.is_empty())
        .map(|entry| (entry.stop.id.clone(), entry))
        .collect();

    if own.relevant_alerts.is_empty() && child_alerts.is_empty() {
        return None;
    }

    let on_children: HashSet<_> = child_alerts
        .values()
        .flat_map(|c| c.relevant_alerts.iter().map(|a| a.id.clone()))
        .collect();
    let relevant_alerts: Vec<Alert> = own
        .relevant_alerts
        .into_iter()
        .filter(|a| !on_children.contains(&a.id))
        .collect();

    Some(AlertAssociatedStop {
        stop: stop.clone(),
        relevant_alerts,
        service_alerts: own.service_alerts,
        service_status,
        child_alerts,
    })
}

fn associate_leaf(global: &GlobalData, stop: &Stop, alerts: &[&Alert]) -> AlertAssociatedStop {
    let mut family: Vec<&StopId> = vec![&stop.id];
    if let Some(parent) = &stop.parent_station_id {
        family.push(parent);
    }

    let relevant_alerts: Vec<Alert> = alerts
        .iter()
        .filter(|a| {
            a.any_informed_entity(|e| e.stop.as_ref().is_some_and(|s| family.contains(&s)))
        })
        .map(|a| (*a).clone())
        .collect();
    let service_alerts: Vec<Alert> = relevant_alerts
        .iter()
        .filter(|a| a.effect.is_no_through_service())
        .cloned()
        .collect();

    let patterns = global.patterns_at_stop(&stop.id);
    let service_status = service_status(&patterns, &service_alerts, &family);

    AlertAssociatedStop {
        stop: stop.clone(),
        relevant_alerts,
        service_alerts,
        service_status,
        child_alerts: BTreeMap::new(),
    }
}

fn service_status(
    patterns: &[&RoutePattern],
    service_alerts: &[Alert],
    family: &[&StopId],
) -> StopServiceStatus {
    if patterns.is_empty() {
        return if service_alerts.is_empty() {
            StopServiceStatus::Normal
        } else {
            StopServiceStatus::NoService
        };
    }

    let covered = patterns
        .iter()
        .filter(|pattern| {
            service_alerts.iter().any(|alert| {
                alert.any_entity_satisfies(|p| {
                    p.check_route(Some(&pattern.route_id))
                        .check_direction(Some(pattern.direction_id))
                        .check_stop_in(family.iter().copied())
                })
            })
        })
        .count();

    if covered == patterns.len() {
        StopServiceStatus::NoService
    } else if covered > 0 {
        StopServiceStatus::PartialService
    } else {
        StopServiceStatus::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouteType, Typicality};
    use crate::global::fixtures::{GlobalBuilder, stop_id};
    use crate::realtime::alert::fixtures::{ALL, alert, entity, time};
    use crate::realtime::{Activity, Effect};

    fn now() -> EasternTime {
        time("2024-03-19T12:00:00-04:00")
    }

    fn ids(alerts: &[Alert]) -> Vec<&str> {
        alerts.iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn suspension_on_standalone_stop_is_no_service() {
        let mut b = GlobalBuilder::new();
        b.stop("1", 0.0, 0.0);
        b.stop("2", 0.0, 0.0);
        let global = b.build();
        let suspension = alert(
            "a",
            Effect::Suspension,
            vec![entity(ALL, Some("r"), None, Some("1"))],
        );

        let map = alerts_by_stop(&global, &[&suspension], now());
        assert_eq!(map.len(), 1);
        let entry = &map["1"];
        assert_eq!(entry.service_status, StopServiceStatus::NoService);
        assert_eq!(ids(&entry.relevant_alerts), vec!["a"]);
        assert_eq!(ids(&entry.service_alerts), vec!["a"]);
    }

    #[test]
    fn alert_on_other_stop_gives_no_entry() {
        let mut b = GlobalBuilder::new();
        b.stop("1", 0.0, 0.0);
        let global = b.build();
        let suspension = alert("a", Effect::Suspension, vec![entity(ALL, None, None, Some("9"))]);

        assert!(alerts_by_stop(&global, &[&suspension], now()).is_empty());
    }

    #[test]
    fn inactive_alert_ignored() {
        let mut b = GlobalBuilder::new();
        b.stop("1", 0.0, 0.0);
        let global = b.build();
        let suspension = alert("a", Effect::Suspension, vec![entity(ALL, None, None, Some("1"))]);

        let later = time("2024-03-21T12:00:00-04:00");
        assert!(alerts_by_stop(&global, &[&suspension], later).is_empty());
    }

    #[test]
    fn child_only_alert_moves_to_child() {
        let mut b = GlobalBuilder::new();
        b.station("place-p", &["c1"]);
        b.route("r", RouteType::HeavyRail, 1);
        b.pattern("p", "r", 0, Typicality::Typical, 1, "Out", &["c1", "z"]);
        let global = b.build();
        let suspension = alert(
            "a",
            Effect::Suspension,
            vec![entity(ALL, Some("r"), None, Some("c1"))],
        );

        let map = alerts_by_stop(&global, &[&suspension], now());
        let parent = &map["place-p"];
        assert!(parent.relevant_alerts.is_empty());
        assert_eq!(parent.service_status, StopServiceStatus::NoService);
        let child = &parent.child_alerts["c1"];
        assert_eq!(ids(&child.relevant_alerts), vec!["a"]);
        assert_eq!(child.service_status, StopServiceStatus::NoService);
        assert!(!map.contains_key("c1"));
    }

    #[test]
    fn mixed_children_give_partial_service() {
        let mut b = GlobalBuilder::new();
        b.station("place-p", &["c1", "c2"]);
        b.route("r", RouteType::HeavyRail, 1);
        b.pattern("p0", "r", 0, Typicality::Typical, 1, "Out", &["c1", "z"]);
        b.pattern("p1", "r", 1, Typicality::Typical, 2, "In", &["z", "c2"]);
        let global = b.build();
        let suspension = alert(
            "s",
            Effect::Suspension,
            vec![entity(ALL, Some("r"), None, Some("c1"))],
        );
        let elevator = alert(
            "e",
            Effect::ElevatorClosure,
            vec![entity(&[], None, None, Some("c2"))],
        );

        let map = alerts_by_stop(&global, &[&suspension, &elevator], now());
        let parent = &map["place-p"];
        assert_eq!(parent.service_status, StopServiceStatus::PartialService);
        assert_eq!(parent.child_alerts.len(), 2);

        let c2 = &parent.child_alerts["c2"];
        assert_eq!(c2.service_status, StopServiceStatus::Normal);
        assert_eq!(ids(&c2.relevant_alerts), vec!["e"]);
        assert!(c2.service_alerts.is_empty());
    }

    #[test]
    fn partial_pattern_coverage_on_leaf() {
        let mut b = GlobalBuilder::new();
        b.stop("1", 0.0, 0.0);
        b.route("r", RouteType::Bus, 1);
        b.route("q", RouteType::Bus, 2);
        b.pattern("rp", "r", 0, Typicality::Typical, 1, "Out", &["1", "2"]);
        b.pattern("qp", "q", 0, Typicality::Typical, 1, "Out", &["1", "3"]);
        let global = b.build();

        let on_r = alert("a", Effect::Detour, vec![entity(ALL, Some("r"), None, Some("1"))]);
        let map = alerts_by_stop(&global, &[&on_r], now());
        assert_eq!(map["1"].service_status, StopServiceStatus::Normal);

        let closed = alert("b", Effect::StopClosure, vec![entity(ALL, Some("r"), None, Some("1"))]);
        let map = alerts_by_stop(&global, &[&closed], now());
        assert_eq!(map["1"].service_status, StopServiceStatus::PartialService);

        let routeless = alert("c", Effect::StopClosure, vec![entity(ALL, None, None, Some("1"))]);
        let map = alerts_by_stop(&global, &[&routeless], now());
        assert_eq!(map["1"].service_status, StopServiceStatus::NoService);
    }

    #[test]
    fn parent_alert_reaches_children_and_is_listed_there() {
        let mut b = GlobalBuilder::new();
        b.station("place-p", &["c1", "c2"]);
        b.route("r", RouteType::HeavyRail, 1);
        b.pattern("p0", "r", 0, Typicality::Typical, 1, "Out", &["c1", "z"]);
        b.pattern("p1", "r", 1, Typicality::Typical, 2, "In", &["z", "c2"]);
        let global = b.build();
        let closure = alert(
            "closed",
            Effect::StationClosure,
            vec![entity(&[Activity::Board], None, None, Some("place-p"))],
        );

        let map = alerts_by_stop(&global, &[&closure], now());
        let parent = &map["place-p"];
        assert_eq!(parent.service_status, StopServiceStatus::NoService);
        assert!(parent.relevant_alerts.is_empty());
        assert_eq!(parent.child_alerts.len(), 2);
        assert_eq!(ids(&parent.service_alerts), vec!["closed"]);
        assert_eq!(
            parent.child_alerts.keys().cloned().collect::<Vec<_>>(),
            vec![stop_id("c1"), stop_id("c2")]
        );
    }
}
