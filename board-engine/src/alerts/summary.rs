//! One-line summaries of disruptions: where and until when.

use std::collections::HashSet;

use chrono::{Days, Duration, NaiveDate, Timelike};

use crate::config::EngineConfig;
use crate::domain::{
    Direction, EasternTime, Route, RoutePattern, RouteType, ServiceDateRounding, Stop, StopId,
};
use crate::global::GlobalData;
use crate::realtime::{ActivePeriod, Alert, AlertSignificance, DurationCertainty, Effect};

/// Which stretch of the route an alert affects.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Location {
    SingleStop { stop_name: String },
    SuccessiveStops {
        start_stop_name: String,
        end_stop_name: String,
    },
    StopToDirection {
        start_stop_name: String,
        direction: Direction,
    },
    DirectionToStop {
        direction: Direction,
        end_stop_name: String,
    },
}

/// When an alert ends, or starts if it has not started yet.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Timeframe {
    UntilFurtherNotice,
    EndOfService,
    Time { time: EasternTime },
    Tomorrow,
    ThisWeek { time: EasternTime },
    LaterDate { time: EasternTime },
    StartingLaterToday { time: EasternTime },
    StartingTomorrow,
    /// The hours of today's period for a recurring alert.
    TimeRange {
        start_time: RangeStart,
        end_time: RangeEnd,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RangeStart {
    StartOfService,
    Time { time: EasternTime },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RangeEnd {
    EndOfService,
    Time { time: EasternTime },
}

/// The last day a recurring alert is in effect.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceEnd {
    UntilFurtherNotice,
    Tomorrow,
    ThisWeek { time: EasternTime },
    LaterDate { time: EasternTime },
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recurrence {
    Daily { ending: RecurrenceEnd },
    SomeDays { ending: RecurrenceEnd },
}

/// News about the alert itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Update {
    /// Still in effect and changed within the update window.
    Active,
    /// Ended within the update window.
    AllClear,
}

/// How recent a change has to be to count as an [`Update`].
const UPDATE_WINDOW_MINS: i64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct AlertSummary {
    pub effect: Effect,
    pub location: Option<Location>,
    pub timeframe: Option<Timeframe>,
    pub recurrence: Option<Recurrence>,
    pub update: Option<Update>,
}

impl AlertSummary {
    /// Summarize `alert` as seen from `stop_id` travelling in `direction_id`.
    ///
    /// Returns `None` for alerts below [`AlertSignificance::Secondary`] and
    /// when neither a location nor a timeframe can be described.
    pub fn summarizing(
        alert: &Alert,
        stop_id: &StopId,
        direction_id: u8,
        patterns: &[&RoutePattern],
        now: EasternTime,
        global: &GlobalData,
        config: &EngineConfig,
    ) -> Option<Self> {
        if alert.significance() < AlertSignificance::Secondary {
            return None;
        }
        let location = alert_location(alert, stop_id, direction_id, patterns, global);
        let recurrence = alert_recurrence(alert, now);
        let timeframe = alert_timeframe(alert, now, recurrence.is_some(), config);
        if location.is_none() && timeframe.is_none() {
            return None;
        }
        Some(Self {
            effect: alert.effect,
            location,
            timeframe,
            recurrence,
            update: alert_update(alert, now),
        })
    }
}

/// The period ends inside the end-of-service window that closes the
/// service day.
fn to_end_of_service(period: &ActivePeriod, config: &EngineConfig) -> bool {
    let Some(end) = period.end else {
        return false;
    };
    let local = end.local();
    let minute_of_day = local.hour() * 60 + local.minute();
    let boundary = crate::domain::SERVICE_DAY_START_HOUR * 60;
    (config.end_of_service_start_mins..=boundary).contains(&minute_of_day)
}

/// The period starts at the service day boundary.
fn from_start_of_service(period: &ActivePeriod) -> bool {
    let local = period.start.local();
    local.hour() == crate::domain::SERVICE_DAY_START_HOUR && local.minute() == 0
}

/// The end date falls later in the same ISO week.
fn later_this_week(on: NaiveDate, end: NaiveDate) -> bool {
    use chrono::Datelike;
    if on.weekday().number_from_monday() >= end.weekday().number_from_monday() {
        return false;
    }
    (end - on).num_days() < 7
}

fn alert_timeframe(
    alert: &Alert,
    now: EasternTime,
    recurring: bool,
    config: &EngineConfig,
) -> Option<Timeframe> {
    let service_date = now.service_date();
    let Some(current) = alert.current_period(now) else {
        let next = alert.next_period(now)?;
        if next.start_service_date() == service_date {
            return Some(Timeframe::StartingLaterToday { time: next.start });
        }
        return Some(Timeframe::StartingTomorrow);
    };
    if alert.duration_certainty == DurationCertainty::Estimated {
        return None;
    }
    let Some(end) = current.end else {
        return Some(Timeframe::UntilFurtherNotice);
    };
    let end_date = current.end_service_date()?;

    if recurring {
        let start_time = if from_start_of_service(current) {
            RangeStart::StartOfService
        } else {
            RangeStart::Time {
                time: current.start,
            }
        };
        let end_time = if to_end_of_service(current, config) {
            RangeEnd::EndOfService
        } else {
            RangeEnd::Time { time: end }
        };
        return Some(Timeframe::TimeRange {
            start_time,
            end_time,
        });
    }

    let timeframe = if end_date == service_date && to_end_of_service(current, config) {
        Timeframe::EndOfService
    } else if end_date == service_date {
        Timeframe::Time { time: end }
    } else if service_date.checked_add_days(Days::new(1)) == Some(end_date) {
        Timeframe::Tomorrow
    } else if later_this_week(service_date, end_date) {
        Timeframe::ThisWeek { time: end }
    } else {
        Timeframe::LaterDate { time: end }
    };
    Some(timeframe)
}

/// How a recurring alert repeats, unless today is its last day.
fn alert_recurrence(alert: &Alert, now: EasternTime) -> Option<Recurrence> {
    let range = alert.recurrence_range()?;
    let service_date = now.service_date();
    let last_date = range.end.service_date_rounded(ServiceDateRounding::Backwards);
    if last_date == service_date {
        return None;
    }
    let ending = if !range.end_day_known {
        RecurrenceEnd::UntilFurtherNotice
    } else if service_date.checked_add_days(Days::new(1)) == Some(last_date) {
        RecurrenceEnd::Tomorrow
    } else if later_this_week(service_date, last_date) {
        RecurrenceEnd::ThisWeek { time: range.end }
    } else {
        RecurrenceEnd::LaterDate { time: range.end }
    };
    Some(if range.daily {
        Recurrence::Daily { ending }
    } else {
        Recurrence::SomeDays { ending }
    })
}

fn alert_update(alert: &Alert, now: EasternTime) -> Option<Update> {
    let window = Duration::minutes(UPDATE_WINDOW_MINS);
    let started = alert.current_period(now).map(|p| p.start);
    let recent = |at: EasternTime| now - window <= at && at <= now;
    let updated_while_active = alert
        .updated_at
        .is_some_and(|updated| started.is_some_and(|start| updated > start) && recent(updated));
    if updated_while_active {
        Some(Update::Active)
    } else if alert.all_clear(now, window) {
        Some(Update::AllClear)
    } else {
        None
    }
}

/// Parent stations named by entities that apply to any of `routes`.
fn affected_parent_stops<'g>(
    alert: &Alert,
    routes: &[&Route],
    global: &'g GlobalData,
) -> Vec<&'g Stop> {
    let mut seen = HashSet::new();
    routes
        .iter()
        .flat_map(|route| {
            alert
                .informed_entity
                .iter()
                .filter(|e| e.predicate().check_route(Some(&route.id)).is_satisfied())
        })
        .filter_map(|e| e.stop.as_ref().and_then(|s| global.parent_stop(s)))
        .filter(|stop| seen.insert(stop.id.clone()))
        .collect()
}

/// Each pattern's stops affected by `alert`, resolved to parent stations.
/// Stop lists contained in a longer list are dropped.
fn affected_pattern_stops<'p>(
    alert: &Alert,
    direction_id: u8,
    patterns: &[&'p RoutePattern],
    global: &GlobalData,
) -> Vec<(&'p RoutePattern, Vec<StopId>)> {
    let pattern_stops: Vec<(&RoutePattern, Vec<StopId>)> = patterns
        .iter()
        .copied()
        .filter(|pattern| pattern.direction_id == direction_id)
        .filter_map(|pattern| {
            let stop_ids = global.pattern_stop_ids(pattern)?;
            let affected: Vec<StopId> = stop_ids
                .iter()
                .filter(|stop| {
                    alert.any_entity_satisfies(|p| {
                        p.check_stop(Some(*stop)).check_route(Some(&pattern.route_id))
                    })
                })
                .map(|stop| global.resolve_parent_id(stop))
                .collect();
            (!affected.is_empty()).then_some((pattern, affected))
        })
        .collect();

    if pattern_stops.len() <= 1 {
        return pattern_stops;
    }
    pattern_stops
        .iter()
        .filter(|(pattern, stops)| {
            !pattern_stops.iter().any(|(other, other_stops)| {
                other.id != pattern.id
                    && other_stops.len() > stops.len()
                    && stops.iter().all(|s| other_stops.contains(s))
            })
        })
        .cloned()
        .collect()
}

fn alert_location(
    alert: &Alert,
    stop_id: &StopId,
    direction_id: u8,
    patterns: &[&RoutePattern],
    global: &GlobalData,
) -> Option<Location> {
    let mut routes: Vec<&Route> = Vec::new();
    for pattern in patterns {
        if let Some(route) = global.routes.get(&pattern.route_id)
            && !routes.iter().any(|r| r.id == route.id)
        {
            routes.push(route);
        }
    }

    let affected = affected_parent_stops(alert, &routes, global);
    if let [stop] = affected.as_slice() {
        return Some(Location::SingleStop {
            stop_name: stop.name.clone(),
        });
    }

    if routes
        .iter()
        .any(|r| !r.is_shuttle() && r.route_type == RouteType::Bus)
    {
        return None;
    }

    let pattern_stops = affected_pattern_stops(alert, direction_id, patterns, global);
    let (_, first_stops) = pattern_stops.iter().find(|(_, stops)| stops.len() > 1)?;
    let ordered: Vec<&Stop> = first_stops
        .iter()
        .filter_map(|id| global.stops.get(id))
        .collect();
    let (first, last) = (ordered.first()?, ordered.last()?);

    let first_set: HashSet<&StopId> = first_stops.iter().collect();
    if pattern_stops
        .iter()
        .all(|(_, stops)| stops.iter().collect::<HashSet<_>>() == first_set)
    {
        return Some(Location::SuccessiveStops {
            start_stop_name: first.name.clone(),
            end_stop_name: last.name.clone(),
        });
    }

    let route = routes.first()?;
    let opposite = 1u8.saturating_sub(direction_id);
    let starts_at = |stop: &Stop| pattern_stops.iter().all(|(_, s)| s.first() == Some(&stop.id));
    let ends_at = |stop: &Stop| pattern_stops.iter().all(|(_, s)| s.last() == Some(&stop.id));

    let from = |stop: &Stop, leading: bool| -> Option<Location> {
        let direction = if starts_at(stop) {
            route.direction(direction_id)
        } else if ends_at(stop) {
            route.direction(opposite)
        } else {
            return None;
        };
        Some(if leading {
            Location::StopToDirection {
                start_stop_name: stop.name.clone(),
                direction,
            }
        } else {
            Location::DirectionToStop {
                direction,
                end_stop_name: stop.name.clone(),
            }
        })
    };

    tracing::trace!(alert = %alert.id, stop = %stop_id, "summarizing branched alert location");
    from(*first, true).or_else(|| from(*last, false))
}
