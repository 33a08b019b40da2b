//! Turning a leaf into the rows a rider sees.
//!
//! A leaf with one headsign shows a single row of departures. A leaf whose
//! trips split across several headsigns (branches) shows a row per branch,
//! giving disrupted branches priority over live trips and live trips
//! priority over branches without predictions.

use std::collections::HashSet;

use crate::config::EngineConfig;
use crate::display::{FormattedTrip, UpcomingTrip};
use crate::domain::{AlertId, EasternTime, Route, RouteId, RoutePattern, RoutePatternId, RouteType};
use crate::global::GlobalData;
use crate::realtime::{Alert, AlertSignificance, Effect, Schedule, applicable_alerts};

use super::route_card::{Context, Leaf, filter_stops_by_patterns};

/// Why a leaf has no departures to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoTripsFormat {
    /// Trips are scheduled but nothing live is coming through.
    PredictionsUnavailable,
    ServiceEndedToday,
    NoSchedulesToday,
}

impl NoTripsFormat {
    pub fn from_upcoming_trips(
        trips: &[UpcomingTrip],
        has_schedules_today: bool,
        now: EasternTime,
    ) -> Self {
        let scheduled_unpredicted = trips.iter().any(|t| {
            t.prediction.is_none()
                && t.schedule
                    .as_ref()
                    .and_then(Schedule::stop_time)
                    .is_some_and(|time| time >= now)
        });
        if scheduled_unpredicted {
            NoTripsFormat::PredictionsUnavailable
        } else if has_schedules_today {
            NoTripsFormat::ServiceEndedToday
        } else {
            NoTripsFormat::NoSchedulesToday
        }
    }
}

/// A less severe alert flagged alongside a leaf's departures.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SecondaryAlert {
    pub alert_id: AlertId,
    pub effect: Effect,
}

impl From<&Alert> for SecondaryAlert {
    fn from(alert: &Alert) -> Self {
        Self {
            alert_id: alert.id.clone(),
            effect: alert.effect,
        }
    }
}

/// What one row of a leaf shows.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpcomingFormat {
    Loading,
    NoTrips {
        no_trips: NoTripsFormat,
        secondary_alert: Option<SecondaryAlert>,
    },
    Disruption {
        alert: Alert,
    },
    Some {
        trips: Vec<FormattedTrip>,
        secondary_alert: Option<SecondaryAlert>,
    },
}

/// One branch of a branched leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BranchRow {
    /// Set when the card is a line, so the rider can tell branches apart.
    pub route: Option<Route>,
    pub headsign: String,
    pub format: UpcomingFormat,
}

/// A formatted leaf.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeafFormat {
    Single {
        route: Option<Route>,
        headsign: Option<String>,
        format: UpcomingFormat,
    },
    Branched {
        branches: Vec<BranchRow>,
        secondary_alert: Option<SecondaryAlert>,
    },
}

/// A route and headsign that might get a row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PotentialService {
    route_id: RouteId,
    headsign: String,
    pattern_ids: HashSet<RoutePatternId>,
}

/// Everything needed to decide what one headsign's row shows.
struct HeadsignData<'a> {
    headsign: String,
    route_id: RouteId,
    patterns: Vec<&'a RoutePattern>,
    has_schedules_today: bool,
    trips: Vec<UpcomingTrip>,
    major_alert: Option<&'a Alert>,
}

impl HeadsignData<'_> {
    fn min_sort_order(&self) -> i32 {
        self.patterns
            .iter()
            .map(|p| p.sort_order)
            .min()
            .unwrap_or(i32::MAX)
    }
}

impl Leaf {
    /// Routes and headsigns that could be shown for this leaf.
    ///
    /// Bus only ever shows its next couple of trips, so only their headsigns
    /// count. Other modes also count every typical headsign, even one with
    /// no trips right now, so a missing branch is still acknowledged.
    fn potential_service(
        &self,
        now: EasternTime,
        global: &GlobalData,
        config: &EngineConfig,
    ) -> Vec<PotentialService> {
        fn add(
            services: &mut Vec<PotentialService>,
            route_id: &RouteId,
            headsign: &str,
            pattern_id: Option<&RoutePatternId>,
        ) {
            let index = match services
                .iter()
                .position(|s| &s.route_id == route_id && s.headsign == headsign)
            {
                Some(index) => index,
                None => {
                    services.push(PotentialService {
                        route_id: route_id.clone(),
                        headsign: headsign.to_string(),
                        pattern_ids: HashSet::new(),
                    });
                    services.len() - 1
                }
            };
            if let Some(id) = pattern_id {
                services[index].pattern_ids.insert(id.clone());
            }
        }

        let mut services: Vec<PotentialService> = Vec::new();
        let cutoff = now + config.non_typical_horizon();
        let is_bus = self.line_or_route.route_type() == RouteType::Bus;
        let upcoming = self
            .upcoming_trips
            .iter()
            .filter(|t| t.is_upcoming_within(now, cutoff));
        let limit = if is_bus && self.context != Context::StopDetailsFiltered {
            config.typical_leaf_rows
        } else {
            usize::MAX
        };
        for trip in upcoming.take(limit) {
            add(
                &mut services,
                &trip.trip.route_id,
                trip.headsign(),
                trip.trip.route_pattern_id.as_ref(),
            );
        }

        if !is_bus {
            for pattern in self.route_patterns.iter().filter(|p| p.is_typical()) {
                let represented = services
                    .iter()
                    .any(|s| s.pattern_ids.contains(&pattern.id));
                if represented {
                    continue;
                }
                let Some(headsign) = global.pattern_headsign(pattern) else {
                    continue;
                };
                add(&mut services, &pattern.route_id, headsign, Some(&pattern.id));
            }
        }
        services
    }

    fn data_by_headsign<'a>(
        &'a self,
        services: &[PotentialService],
        global: &GlobalData,
    ) -> Vec<HeadsignData<'a>> {
        let major_alerts: Vec<&Alert> = self
            .alerts_here(None)
            .into_iter()
            .filter(|a| a.significance() >= AlertSignificance::Major)
            .collect();
        services
            .iter()
            .map(|service| {
                let patterns: Vec<&RoutePattern> = self
                    .route_patterns
                    .iter()
                    .filter(|p| service.pattern_ids.contains(&p.id))
                    .collect();
                let stop_ids = filter_stops_by_patterns(&patterns, global, &self.stop_ids);
                let route_ids: Vec<RouteId> = patterns.iter().map(|p| p.route_id.clone()).collect();
                let major_alert = applicable_alerts(
                    major_alerts.iter().copied(),
                    Some(self.direction_id),
                    &route_ids,
                    Some(&stop_ids),
                    None,
                )
                .into_iter()
                .next();
                HeadsignData {
                    headsign: service.headsign.clone(),
                    route_id: service.route_id.clone(),
                    has_schedules_today: patterns.iter().any(|p| {
                        self.has_schedules_today_by_pattern
                            .get(&p.id)
                            .copied()
                            .unwrap_or(false)
                    }),
                    patterns,
                    trips: self
                        .upcoming_trips
                        .iter()
                        .filter(|t| t.headsign() == service.headsign)
                        .cloned()
                        .collect(),
                    major_alert,
                }
            })
            .collect()
    }

    /// Format the leaf for display.
    pub fn format(
        &self,
        now: EasternTime,
        global: &GlobalData,
        config: &EngineConfig,
    ) -> LeafFormat {
        let route_type = self.line_or_route.route_type();
        let services = self.potential_service(now, global, config);
        let is_branching = services.len() > 1;

        let rows = match self.context {
            Context::StopDetailsFiltered => usize::MAX,
            _ if is_branching && route_type != RouteType::Bus => config.branching_leaf_rows,
            _ => config.typical_leaf_rows,
        };
        let allow_arrival_only = !route_type.is_subway();
        let formatted: Vec<(&UpcomingTrip, FormattedTrip)> = self
            .upcoming_trips
            .iter()
            .filter_map(|t| Some((t, t.format(now, route_type, allow_arrival_only, config)?)))
            .collect();
        let live_headsigns: HashSet<&str> = formatted.iter().map(|(t, _)| t.headsign()).collect();
        let trips: Vec<FormattedTrip> = formatted
            .iter()
            .take(rows)
            .map(|(_, trip)| trip.clone())
            .collect();

        let secondary_alert = self.secondary_alert().map(SecondaryAlert::from);
        let major_alert = self.major_alert();

        if major_alert.is_none() && trips.is_empty() {
            let service = if is_branching { None } else { services.first() };
            let route = service.and_then(|s| self.route(global, &s.route_id)).cloned();
            let headsign = service.map(|s| s.headsign.clone());
            let format = if self.all_data_loaded {
                UpcomingFormat::NoTrips {
                    no_trips: NoTripsFormat::from_upcoming_trips(
                        &self.upcoming_trips,
                        self.has_schedules_today(),
                        now,
                    ),
                    secondary_alert,
                }
            } else {
                UpcomingFormat::Loading
            };
            return LeafFormat::Single {
                route,
                headsign,
                format,
            };
        }

        // A major alert only replaces departures when nothing is coming.
        let flagged = major_alert.map(SecondaryAlert::from).or(secondary_alert);

        if is_branching {
            return self.format_branched(
                &services,
                &live_headsigns,
                trips,
                flagged,
                global,
                now,
                config,
            );
        }

        let service = services.first();
        let format = match major_alert {
            Some(alert) if trips.is_empty() => UpcomingFormat::Disruption {
                alert: alert.clone(),
            },
            _ => UpcomingFormat::Some {
                trips,
                secondary_alert: flagged,
            },
        };
        LeafFormat::Single {
            route: service.and_then(|s| self.route(global, &s.route_id)).cloned(),
            headsign: service.map(|s| s.headsign.clone()),
            format,
        }
    }

    /// Rows for a leaf known to branch.
    ///
    /// A branch is disrupted when a major alert applies to it and none of its
    /// trips are live. If every branch is disrupted by one alert the leaf
    /// collapses to that disruption. Otherwise rows are filled in this order:
    /// 1. Disrupted branches, in pattern order, up to the branching row count
    /// 2. Live trips, at least one
    /// 3. Undisrupted branches whose predictions are missing
    #[allow(clippy::too_many_arguments)]
    fn format_branched(
        &self,
        services: &[PotentialService],
        live_headsigns: &HashSet<&str>,
        trips: Vec<FormattedTrip>,
        secondary_alert: Option<SecondaryAlert>,
        global: &GlobalData,
        now: EasternTime,
        config: &EngineConfig,
    ) -> LeafFormat {
        let trip_row = |trip: FormattedTrip| BranchRow {
            route: self.route(global, &trip.route_id).cloned(),
            headsign: trip.headsign.clone(),
            format: UpcomingFormat::Some {
                trips: vec![trip],
                secondary_alert: None,
            },
        };

        let (mut disrupted, mut undisrupted): (Vec<_>, Vec<_>) = self
            .data_by_headsign(services, global)
            .into_iter()
            .partition(|data| {
                data.major_alert.is_some() && !live_headsigns.contains(data.headsign.as_str())
            });

        if disrupted.is_empty() {
            return LeafFormat::Branched {
                branches: trips.into_iter().map(trip_row).collect(),
                secondary_alert,
            };
        }

        if undisrupted.is_empty() {
            let first = disrupted[0].major_alert;
            if let Some(alert) = first
                && disrupted.iter().all(|d| d.major_alert.map(|a| &a.id) == Some(&alert.id))
            {
                return LeafFormat::Single {
                    route: None,
                    headsign: None,
                    format: UpcomingFormat::Disruption {
                        alert: alert.clone(),
                    },
                };
            }
        }

        disrupted.sort_by_key(HeadsignData::min_sort_order);
        let disrupted_rows: Vec<BranchRow> = disrupted
            .into_iter()
            .take(config.branching_leaf_rows)
            .filter_map(|data| {
                Some(BranchRow {
                    route: self.route(global, &data.route_id).cloned(),
                    format: UpcomingFormat::Disruption {
                        alert: data.major_alert?.clone(),
                    },
                    headsign: data.headsign,
                })
            })
            .collect();

        let mut remaining = config
            .branching_leaf_rows
            .saturating_sub(disrupted_rows.len())
            .max(1);
        let trip_rows: Vec<BranchRow> = trips.into_iter().take(remaining).map(trip_row).collect();
        remaining = remaining.saturating_sub(trip_rows.len());

        undisrupted.sort_by_key(HeadsignData::min_sort_order);
        let unavailable_rows: Vec<BranchRow> = undisrupted
            .into_iter()
            .filter(|data| {
                NoTripsFormat::from_upcoming_trips(&data.trips, data.has_schedules_today, now)
                    == NoTripsFormat::PredictionsUnavailable
            })
            .take(remaining)
            .map(|data| BranchRow {
                route: self.route(global, &data.route_id).cloned(),
                headsign: data.headsign,
                format: UpcomingFormat::NoTrips {
                    no_trips: NoTripsFormat::PredictionsUnavailable,
                    secondary_alert: None,
                },
            })
            .collect();

        LeafFormat::Branched {
            branches: trip_rows
                .into_iter()
                .chain(unavailable_rows)
                .chain(disrupted_rows)
                .collect(),
            secondary_alert,
        }
    }
}

/// Trips in a format, in display order.
pub(crate) fn formatted_trips(format: &LeafFormat) -> Vec<&FormattedTrip> {
    fn from_upcoming(format: &UpcomingFormat) -> Vec<&FormattedTrip> {
        match format {
            UpcomingFormat::Some { trips, .. } => trips.iter().collect(),
            _ => Vec::new(),
        }
    }
    match format {
        LeafFormat::Single { format, .. } => from_upcoming(format),
        LeafFormat::Branched { branches, .. } => branches
            .iter()
            .flat_map(|row| from_upcoming(&row.format))
            .collect(),
    }
}
