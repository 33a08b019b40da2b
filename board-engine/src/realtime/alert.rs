//! Service alerts and the rules for deciding where they apply.
//!
//! An alert carries a list of informed entities. Each entity narrows the
//! alert to some combination of route, direction, stop, trip and rider
//! activity; a field left empty matches anything.

use std::collections::{HashMap, HashSet};

use chrono::{Duration, NaiveDate};

use crate::domain::{
    AlertId, EasternTime, RouteId, RoutePattern, RouteType, ServiceDateRounding, StopId, Trip,
    TripId,
};

/// Effects reported by the alerts feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    AccessIssue,
    AdditionalService,
    AmberAlert,
    BikeIssue,
    Cancellation,
    Delay,
    Detour,
    DockClosure,
    DockIssue,
    ElevatorClosure,
    EscalatorClosure,
    ExtraService,
    FacilityIssue,
    ModifiedService,
    NoService,
    OtherEffect,
    ParkingClosure,
    ParkingIssue,
    PolicyChange,
    ScheduleChange,
    ServiceChange,
    Shuttle,
    SnowRoute,
    StationClosure,
    StationIssue,
    StopClosure,
    StopMove,
    StopMoved,
    StopShoveling,
    Summary,
    Suspension,
    TrackChange,
    #[default]
    #[serde(other)]
    UnknownEffect,
}

impl Effect {
    /// Effects after which no trains or buses pass through the affected stops.
    pub fn is_no_through_service(&self) -> bool {
        matches!(
            self,
            Effect::Suspension
                | Effect::Shuttle
                | Effect::StationClosure
                | Effect::StopClosure
                | Effect::DockClosure
        )
    }
}

/// Causes reported by the alerts feed. Only the ones with special handling
/// are named; the rest collapse into [`Cause::UnknownCause`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    Accident,
    Construction,
    Maintenance,
    MechanicalProblem,
    SignalProblem,
    SingleTracking,
    SpecialEvent,
    TrackWork,
    Weather,
    #[default]
    #[serde(other)]
    UnknownCause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Board,
    BringingBike,
    Exit,
    ParkCar,
    Ride,
    StoreBike,
    UsingEscalator,
    UsingWheelchair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationCertainty {
    Estimated,
    Known,
    #[default]
    Unknown,
}

/// How prominently an alert should be surfaced.
///
/// Variants are ordered from least to most significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSignificance {
    None,
    Minor,
    Accessibility,
    Secondary,
    Major,
}

/// The part of the network an alert applies to. Empty fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct InformedEntity {
    pub activities: Vec<Activity>,
    pub direction_id: Option<u8>,
    pub facility: Option<String>,
    pub route: Option<RouteId>,
    pub route_type: Option<RouteType>,
    pub stop: Option<StopId>,
    pub trip: Option<TripId>,
}

fn wildcard_matches<T: PartialEq>(expected: Option<&T>, actual: Option<&T>) -> bool {
    match (expected, actual) {
        (Some(expected), Some(actual)) => expected == actual,
        _ => true,
    }
}

impl InformedEntity {
    /// True if every given value matches this entity. Arguments left as
    /// `None`, and fields the entity leaves empty, match anything.
    pub fn applies_to(
        &self,
        direction_id: Option<u8>,
        route: Option<&RouteId>,
        stop: Option<&StopId>,
        trip: Option<&TripId>,
    ) -> bool {
        wildcard_matches(direction_id.as_ref(), self.direction_id.as_ref())
            && wildcard_matches(route, self.route.as_ref())
            && wildcard_matches(stop, self.stop.as_ref())
            && wildcard_matches(trip, self.trip.as_ref())
    }

    /// Start a chain of checks against this entity.
    pub fn predicate(&self) -> EntityPredicate<'_> {
        EntityPredicate {
            entity: self,
            satisfied: true,
        }
    }
}

/// A chain of constraints evaluated against one [`InformedEntity`].
///
/// Activity checks are strict. Direction, route, stop and trip checks pass
/// when the entity leaves that field empty, and single-value checks also
/// pass when given `None`.
///
/// ```
/// use board_engine::realtime::{Activity, InformedEntity};
///
/// let entity = InformedEntity {
///     activities: vec![Activity::Board],
///     direction_id: Some(0),
///     ..Default::default()
/// };
/// let boarding = entity.predicate().check_activity(Activity::Board);
/// assert!(boarding.check_direction(Some(0)).is_satisfied());
/// assert!(!entity.predicate().check_direction(Some(1)).is_satisfied());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EntityPredicate<'a> {
    entity: &'a InformedEntity,
    satisfied: bool,
}

impl<'a> EntityPredicate<'a> {
    fn and(mut self, ok: impl FnOnce(&InformedEntity) -> bool) -> Self {
        if self.satisfied && !ok(self.entity) {
            self.satisfied = false;
        }
        self
    }

    pub fn check_activity(self, activity: Activity) -> Self {
        self.and(|e| e.activities.contains(&activity))
    }

    pub fn check_activity_in(self, activities: &[Activity]) -> Self {
        self.and(|e| e.activities.iter().any(|a| activities.contains(a)))
    }

    pub fn check_direction(self, direction_id: Option<u8>) -> Self {
        self.and(|e| wildcard_matches(direction_id.as_ref(), e.direction_id.as_ref()))
    }

    pub fn check_route(self, route_id: Option<&RouteId>) -> Self {
        self.and(|e| wildcard_matches(route_id, e.route.as_ref()))
    }

    pub fn check_route_in<'r>(self, route_ids: impl IntoIterator<Item = &'r RouteId>) -> Self {
        self.and(|e| match &e.route {
            Some(route) => route_ids.into_iter().any(|r| r == route),
            None => true,
        })
    }

    pub fn check_stop(self, stop_id: Option<&StopId>) -> Self {
        self.and(|e| wildcard_matches(stop_id, e.stop.as_ref()))
    }

    pub fn check_stop_in<'s>(self, stop_ids: impl IntoIterator<Item = &'s StopId>) -> Self {
        self.and(|e| match &e.stop {
            Some(stop) => stop_ids.into_iter().any(|s| s == stop),
            None => true,
        })
    }

    pub fn check_trip(self, trip_id: Option<&TripId>) -> Self {
        self.and(|e| wildcard_matches(trip_id, e.trip.as_ref()))
    }

    pub fn is_satisfied(&self) -> bool {
        self.satisfied
    }
}

/// A window during which an alert is in effect. An open end means the alert
/// runs until further notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ActivePeriod {
    pub start: EasternTime,
    #[serde(default)]
    pub end: Option<EasternTime>,
}

impl ActivePeriod {
    pub fn active_at(&self, now: EasternTime) -> bool {
        match self.end {
            None => self.start <= now,
            Some(end) => self.start <= now && now <= end,
        }
    }

    pub fn start_service_date(&self) -> NaiveDate {
        self.start.service_date()
    }

    /// Service date of the end, rounding 03:00 back onto the day it closes.
    pub fn end_service_date(&self) -> Option<NaiveDate> {
        self.end
            .map(|end| end.service_date_rounded(ServiceDateRounding::Backwards))
    }
}

/// Active periods that repeat at the same local times on several
/// service days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecurrenceRange {
    /// End of the last period.
    pub end: EasternTime,
    /// No service day is skipped between the first period and the last.
    pub daily: bool,
    pub end_day_known: bool,
}

/// A service alert.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Alert {
    pub id: AlertId,
    #[serde(default)]
    pub active_period: Vec<ActivePeriod>,
    #[serde(default)]
    pub cause: Cause,
    #[serde(default)]
    pub effect: Effect,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub duration_certainty: DurationCertainty,
    #[serde(default)]
    pub informed_entity: Vec<InformedEntity>,
    #[serde(default)]
    pub severity: i32,
    #[serde(default)]
    pub updated_at: Option<EasternTime>,
}

const EXIT_OR_RIDE: &[Activity] = &[Activity::Exit, Activity::Ride];

impl Alert {
    pub fn current_period(&self, now: EasternTime) -> Option<&ActivePeriod> {
        self.active_period.iter().find(|p| p.active_at(now))
    }

    pub fn is_active(&self, now: EasternTime) -> bool {
        self.current_period(now).is_some()
    }

    /// The earliest period that has not started yet.
    pub fn next_period(&self, now: EasternTime) -> Option<&ActivePeriod> {
        self.active_period
            .iter()
            .filter(|p| p.start > now)
            .min_by_key(|p| p.start)
    }

    /// The periods as a recurrence, if there are at least two and each one
    /// spans the same local times within a single service day.
    pub fn recurrence_range(&self) -> Option<RecurrenceRange> {
        if self.active_period.len() < 2 {
            return None;
        }
        let mut periods: Vec<&ActivePeriod> = self.active_period.iter().collect();
        periods.sort_by_key(|p| p.start);
        let local_times =
            |p: &ActivePeriod| Some((p.start.local().time(), p.end?.local().time()));

        let (first, _) = periods.split_first()?;
        let times = local_times(*first)?;
        let mut dates = Vec::with_capacity(periods.len());
        for period in &periods {
            if local_times(*period)? != times
                || period.end_service_date()? != period.start_service_date()
            {
                return None;
            }
            dates.push(period.start_service_date());
        }

        Some(RecurrenceRange {
            end: periods.last()?.end?,
            daily: dates.windows(2).all(|w| w[0].succ_opt() == Some(w[1])),
            end_day_known: self.duration_certainty != DurationCertainty::Unknown,
        })
    }

    /// Every period is over and the last one closed within `window` of `now`.
    pub fn all_clear(&self, now: EasternTime, window: Duration) -> bool {
        let mut ends = Vec::with_capacity(self.active_period.len());
        for period in &self.active_period {
            match period.end {
                Some(end) if end < now => ends.push(end),
                _ => return false,
            }
        }
        ends.into_iter().max().is_some_and(|last| now - window <= last)
    }

    /// Every informed entity names a stop.
    pub fn has_stops_specified(&self) -> bool {
        self.informed_entity.iter().all(|e| e.stop.is_some())
    }

    pub fn significance(&self) -> AlertSignificance {
        match self.effect {
            Effect::Shuttle | Effect::Suspension => AlertSignificance::Major,
            Effect::StationClosure
            | Effect::StopClosure
            | Effect::DockClosure
            | Effect::Detour
            | Effect::SnowRoute => {
                if self.has_stops_specified() {
                    AlertSignificance::Major
                } else {
                    AlertSignificance::Secondary
                }
            }
            Effect::ServiceChange => AlertSignificance::Secondary,
            Effect::ElevatorClosure => AlertSignificance::Accessibility,
            Effect::TrackChange => AlertSignificance::Minor,
            Effect::Delay => {
                let severe_off_bus = self.severity >= 3
                    && self
                        .informed_entity
                        .iter()
                        .any(|e| e.route_type != Some(RouteType::Bus));
                if severe_off_bus || self.cause == Cause::SingleTracking {
                    AlertSignificance::Minor
                } else {
                    AlertSignificance::None
                }
            }
            _ => AlertSignificance::None,
        }
    }

    pub fn any_informed_entity(&self, predicate: impl Fn(&InformedEntity) -> bool) -> bool {
        self.informed_entity.iter().any(predicate)
    }

    /// True if any informed entity satisfies the checks built by `build`.
    pub fn any_entity_satisfies(
        &self,
        build: impl Fn(EntityPredicate<'_>) -> EntityPredicate<'_>,
    ) -> bool {
        self.informed_entity
            .iter()
            .any(|e| build(e.predicate()).is_satisfied())
    }

    /// True if an informed entity names `route_id`.
    pub fn informs_route(&self, route_id: &RouteId) -> bool {
        self.any_informed_entity(|e| e.route.as_ref() == Some(route_id))
    }
}

fn distinct<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Vec<&'a Alert> {
    let mut seen = HashSet::new();
    alerts
        .into_iter()
        .filter(|a| seen.insert(&a.id))
        .collect()
}

/// Alerts that affect boarding the given routes at the given stops.
///
/// `stop_ids` of `None` skips the stop check.
pub fn applicable_alerts<'a>(
    alerts: impl IntoIterator<Item = &'a Alert>,
    direction_id: Option<u8>,
    route_ids: &[RouteId],
    stop_ids: Option<&HashSet<StopId>>,
    trip_id: Option<&TripId>,
) -> Vec<&'a Alert> {
    distinct(alerts.into_iter().filter(|alert| {
        alert.any_entity_satisfies(|p| {
            let p = p
                .check_activity(Activity::Board)
                .check_direction(direction_id)
                .check_route_in(route_ids);
            let p = match stop_ids {
                Some(stops) => p.check_stop_in(stops),
                None => p,
            };
            p.check_trip(trip_id)
        })
    }))
}

/// Elevator closures that affect wheelchair users at any of `stop_ids`.
pub fn elevator_alerts<'a>(
    alerts: impl IntoIterator<Item = &'a Alert>,
    stop_ids: &HashSet<StopId>,
) -> Vec<&'a Alert> {
    distinct(alerts.into_iter().filter(|alert| {
        alert.effect == Effect::ElevatorClosure
            && alert.any_informed_entity(|e| {
                e.activities.contains(&Activity::UsingWheelchair)
                    && stop_ids
                        .iter()
                        .any(|s| e.applies_to(None, None, Some(s), None))
            })
    }))
}

fn rides_through<'p>(p: EntityPredicate<'p>, trip: &Trip) -> EntityPredicate<'p> {
    p.check_activity_in(EXIT_OR_RIDE)
        .check_direction(Some(trip.direction_id))
        .check_route(Some(&trip.route_id))
}

/// Alerts at the first stop after the target stop on `trip` that differ from
/// the alerts at the target stop.
///
/// Only alerts that name stops and are at least
/// [`AlertSignificance::Accessibility`] are considered.
pub fn downstream_alerts<'a>(
    alerts: impl IntoIterator<Item = &'a Alert>,
    trip: &Trip,
    target_stop_family: &HashSet<StopId>,
) -> Vec<&'a Alert> {
    let candidates: Vec<&Alert> = alerts
        .into_iter()
        .filter(|a| a.has_stops_specified() && a.significance() >= AlertSignificance::Accessibility)
        .collect();

    let target_alert_ids: HashSet<&AlertId> = candidates
        .iter()
        .filter(|a| {
            a.any_entity_satisfies(|p| rides_through(p, trip).check_stop_in(target_stop_family))
        })
        .map(|a| &a.id)
        .collect();

    let Some(target_index) = trip
        .stop_ids
        .iter()
        .position(|s| target_stop_family.contains(s))
    else {
        return Vec::new();
    };

    trip.stop_ids[target_index + 1..]
        .iter()
        .map(|stop| {
            candidates
                .iter()
                .copied()
                .filter(|a| {
                    !target_alert_ids.contains(&a.id)
                        && a.any_entity_satisfies(|p| rides_through(p, trip).check_stop(Some(stop)))
                })
                .collect::<Vec<_>>()
        })
        .find(|stop_alerts| !stop_alerts.is_empty())
        .unwrap_or_default()
}

/// The distinct union of [`downstream_alerts`] over each pattern's
/// representative trip.
pub fn alerts_downstream_for_patterns<'a>(
    alerts: &[&'a Alert],
    patterns: &[&RoutePattern],
    target_stop_family: &HashSet<StopId>,
    trips: &HashMap<TripId, Trip>,
) -> Vec<&'a Alert> {
    distinct(patterns.iter().flat_map(|pattern| {
        trips
            .get(&pattern.representative_trip_id)
            .map(|trip| downstream_alerts(alerts.iter().copied(), trip, target_stop_family))
            .unwrap_or_default()
    }))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn time(s: &str) -> EasternTime {
        EasternTime::parse_rfc3339(s).unwrap()
    }

    /// An alert active for a day around 2024-03-19 noon.
    pub fn alert(id: &str, effect: Effect, entities: Vec<InformedEntity>) -> Alert {
        Alert {
            id: AlertId::new(id).unwrap(),
            active_period: vec![ActivePeriod {
                start: time("2024-03-19T00:00:00-04:00"),
                end: Some(time("2024-03-20T00:00:00-04:00")),
            }],
            cause: Cause::UnknownCause,
            effect,
            header: None,
            description: None,
            duration_certainty: DurationCertainty::Unknown,
            informed_entity: entities,
            severity: 5,
            updated_at: None,
        }
    }

    pub fn entity(
        activities: &[Activity],
        route: Option<&str>,
        direction_id: Option<u8>,
        stop: Option<&str>,
    ) -> InformedEntity {
        InformedEntity {
            activities: activities.to_vec(),
            direction_id,
            route: route.map(|r| RouteId::new(r).unwrap()),
            stop: stop.map(|s| StopId::new(s).unwrap()),
            ..Default::default()
        }
    }

    pub const ALL: &[Activity] = &[Activity::Board, Activity::Exit, Activity::Ride];
}
