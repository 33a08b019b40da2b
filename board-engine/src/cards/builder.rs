//! Building route cards for a list of stops.
//!
//! The pass runs in stages over a mutable builder tree keyed by line or
//! route, stop and direction:
//!
//! 1. Static data: patterns at each stop, after temporary terminal
//!    filtering and rewriting, grouped into cards, stops and leaves
//! 2. Upcoming trips, placed by line or route, parent stop and direction
//! 3. Pruning leaves with nothing worth showing
//! 4. Alerts here and downstream
//! 5. Freezing into [`RouteCard`]s and sorting

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::config::EngineConfig;
use crate::display::{UpcomingTrip, all_arrival_only};
use crate::domain::{
    Direction, EasternTime, Position, RouteId, RoutePattern, RoutePatternId, RouteType, Stop,
    StopId, TripId,
};
use crate::global::{GlobalData, StopFamily};
use crate::realtime::{
    Alert, AlertsResponse, PredictionsResponse, ScheduleResponse, alerts_downstream_for_patterns,
    applicable_alerts, elevator_alerts,
};
use crate::sorting::{compare_leaves_at_stop, compare_route_cards, compare_stops_on_route};
use crate::terminal::{
    RouteActivity, StopPatterns, TemporaryTerminalFilter, TemporaryTerminalRewriter, Truncations,
};

use super::route_card::{
    Context, GroupedLine, Leaf, LineOrRoute, RouteCard, RouteStopData, filter_stops_by_patterns,
};

/// What the caller is asking a board for.
#[derive(Debug, Clone)]
pub struct BoardRequest {
    /// Requested stops, nearest or most relevant first.
    pub stop_ids: Vec<StopId>,
    pub position: Option<Position>,
    pub context: Context,
    /// Ids of cards (line or route ids) to pin to the top.
    pub pinned: HashSet<String>,
    pub now: EasternTime,
}

/// The snapshots a pass reads. Feeds that have not arrived yet are `None`.
#[derive(Debug, Clone, Copy)]
pub struct FeedSources<'a> {
    pub global: &'a GlobalData,
    pub schedules: Option<&'a ScheduleResponse>,
    pub predictions: Option<&'a PredictionsResponse>,
    pub alerts: Option<&'a AlertsResponse>,
}

struct LeafBuilder {
    direction_id: u8,
    patterns: Vec<RoutePattern>,
    unseen: HashSet<RoutePatternId>,
    stop_ids: HashSet<StopId>,
    upcoming_trips: Vec<UpcomingTrip>,
    has_schedules_today_by_pattern: BTreeMap<RoutePatternId, bool>,
    alerts_here: Vec<Alert>,
    alerts_downstream: Vec<Alert>,
}

struct StopBuilder {
    stop: Stop,
    directions: Vec<Direction>,
    leaves: Vec<LeafBuilder>,
}

struct CardBuilder {
    line_or_route: LineOrRoute,
    stops: Vec<StopBuilder>,
}

/// Id of the card a route's service lands on.
fn line_or_route_id(
    global: &GlobalData,
    route_id: &RouteId,
    config: &EngineConfig,
) -> Option<String> {
    let route = global.routes.get(route_id)?;
    Some(match global.grouping_line(route_id, config) {
        Some(line) => line.id.to_string(),
        None => route.id.to_string(),
    })
}

fn line_or_route(
    global: &GlobalData,
    route_id: &RouteId,
    config: &EngineConfig,
) -> Option<LineOrRoute> {
    let route = global.routes.get(route_id)?;
    match global.grouping_line(route_id, config) {
        Some(line) => {
            let routes = global
                .routes_for_line(&line.id)
                .into_iter()
                .filter(|r| !r.is_shuttle())
                .cloned()
                .collect();
            GroupedLine::new(line.clone(), routes).map(LineOrRoute::Line)
        }
        None => Some(LineOrRoute::Route(route.clone())),
    }
}

/// Build the cards for `request`, or `None` while predictions or alerts
/// have not loaded yet.
pub fn route_cards_for_stop_list(
    request: &BoardRequest,
    sources: FeedSources<'_>,
    config: &EngineConfig,
) -> Option<Vec<RouteCard>> {
    let (Some(predictions), Some(alerts)) = (sources.predictions, sources.alerts) else {
        tracing::debug!("predictions or alerts still loading");
        return None;
    };
    let global = sources.global;
    let now = request.now;
    let empty = ScheduleResponse::default();
    let schedules = sources.schedules.unwrap_or(&empty);
    let active_alerts = alerts.active(now);

    let activity = RouteActivity::new(global, schedules, predictions, &active_alerts, now);
    let mut truncations = Truncations::default();
    let mut cards = add_static_stops_data(request, global, &activity, &mut truncations, config);

    let rewritten = TemporaryTerminalRewriter::new(&activity).rewrite_predictions(&truncations);
    let upcoming = UpcomingTrip::trips_from_data(
        global,
        &schedules.schedules,
        &predictions.predictions,
        |id: &TripId| {
            rewritten
                .get(id)
                .or_else(|| predictions.trips.get(id))
                .or_else(|| schedules.trips.get(id))
                .or_else(|| global.trips.get(id))
        },
        &predictions.vehicles,
        now,
    );
    add_upcoming_trips(&mut cards, upcoming, sources.schedules, global, config);

    let all_data_loaded = sources.schedules.is_some();
    filter_irrelevant_data(&mut cards, request, all_data_loaded, global, config);
    add_alerts(&mut cards, &active_alerts, request.context, global);

    let cards = build(cards, request, all_data_loaded);
    tracing::debug!(
        stops = request.stop_ids.len(),
        cards = cards.len(),
        "built route cards"
    );
    Some(cards)
}

/// Lay out cards, stops and leaves from static data.
///
/// A stop is only included on a card if it serves a pattern that no
/// earlier stop in the request served for that card.
fn add_static_stops_data(
    request: &BoardRequest,
    global: &GlobalData,
    activity: &RouteActivity<'_>,
    truncations: &mut Truncations,
    config: &EngineConfig,
) -> Vec<CardBuilder> {
    let filter = TemporaryTerminalFilter::new(activity);
    let rewriter = TemporaryTerminalRewriter::new(activity);

    let mut cards: Vec<CardBuilder> = Vec::new();
    let mut seen: HashMap<String, HashSet<RoutePatternId>> = HashMap::new();

    for family in global.resolved_parent_to_all_stops(&request.stop_ids) {
        let grouped = StopPatterns::group(global, &family, &global.patterns_at_family(&family));
        let filtered = filter.filter_patterns_at_stop(grouped);
        let stop_patterns = rewriter.truncate_patterns_at_stop(filtered, truncations);

        // A typical pattern that runs truncated here is represented by its
        // truncation, whose headsign riders will actually see.
        let mut by_card: Vec<(String, Vec<RoutePattern>)> = Vec::new();
        for pattern in stop_patterns
            .groupings
            .iter()
            .flat_map(|g| &g.patterns)
            .filter(|p| !(p.is_typical() && truncations.truncates(&p.id, &stop_patterns.stop_ids)))
        {
            let Some(id) = line_or_route_id(global, &pattern.route_id, config) else {
                continue;
            };
            match by_card.iter_mut().find(|(card_id, _)| *card_id == id) {
                Some((_, patterns)) => patterns.push(pattern.clone()),
                None => by_card.push((id, vec![pattern.clone()])),
            }
        }

        for (card_id, patterns) in by_card {
            let seen_for_card = seen.entry(card_id.clone()).or_default();
            let unseen: HashSet<RoutePatternId> = patterns
                .iter()
                .map(|p| p.id.clone())
                .filter(|id| !seen_for_card.contains(id))
                .collect();
            if unseen.is_empty() {
                continue;
            }
            seen_for_card.extend(unseen.iter().cloned());

            let index = match cards.iter().position(|c| c.line_or_route.id() == card_id) {
                Some(index) => index,
                None => {
                    let Some(lor) = line_or_route(global, &patterns[0].route_id, config) else {
                        continue;
                    };
                    cards.push(CardBuilder {
                        line_or_route: lor,
                        stops: Vec::new(),
                    });
                    cards.len() - 1
                }
            };
            let card = &mut cards[index];
            let stop = stop_builder(&card.line_or_route, &family, patterns, &unseen, global);
            card.stops.push(stop);
        }
    }
    cards
}

fn stop_builder(
    line_or_route: &LineOrRoute,
    family: &StopFamily,
    patterns: Vec<RoutePattern>,
    unseen: &HashSet<RoutePatternId>,
    global: &GlobalData,
) -> StopBuilder {
    let typical: Vec<RoutePattern> = patterns.iter().filter(|p| p.is_typical()).cloned().collect();
    let directions = if typical.is_empty() {
        line_or_route.directions(&patterns)
    } else {
        line_or_route.directions(&typical)
    };

    let mut by_direction: BTreeMap<u8, Vec<RoutePattern>> = BTreeMap::new();
    for pattern in patterns {
        by_direction.entry(pattern.direction_id).or_default().push(pattern);
    }
    let leaves = by_direction
        .into_iter()
        .map(|(direction_id, patterns)| {
            let refs: Vec<&RoutePattern> = patterns.iter().collect();
            let stop_ids = filter_stops_by_patterns(&refs, global, &family.stop_ids);
            LeafBuilder {
                direction_id,
                unseen: patterns
                    .iter()
                    .map(|p| p.id.clone())
                    .filter(|id| unseen.contains(id))
                    .collect(),
                has_schedules_today_by_pattern: patterns
                    .iter()
                    .map(|p| (p.id.clone(), false))
                    .collect(),
                patterns,
                stop_ids,
                upcoming_trips: Vec::new(),
                alerts_here: Vec::new(),
                alerts_downstream: Vec::new(),
            }
        })
        .collect();

    StopBuilder {
        stop: family.stop.clone(),
        directions,
        leaves,
    }
}

fn add_upcoming_trips(
    cards: &mut [CardBuilder],
    upcoming: Vec<UpcomingTrip>,
    schedules: Option<&ScheduleResponse>,
    global: &GlobalData,
    config: &EngineConfig,
) {
    let mut by_slot: HashMap<(String, StopId, u8), Vec<UpcomingTrip>> = HashMap::new();
    for trip in upcoming {
        let Some(parent) = trip.stop_id().and_then(|id| global.parent_stop(id)) else {
            continue;
        };
        let Some(card_id) = line_or_route_id(global, &trip.trip.route_id, config) else {
            continue;
        };
        by_slot
            .entry((card_id, parent.id.clone(), trip.trip.direction_id))
            .or_default()
            .push(trip);
    }

    let scheduled_today = schedules.map(ScheduleResponse::schedules_today_by_pattern);
    for card in cards {
        let card_id = card.line_or_route.id().to_string();
        for stop in &mut card.stops {
            for leaf in &mut stop.leaves {
                let key = (card_id.clone(), stop.stop.id.clone(), leaf.direction_id);
                leaf.upcoming_trips = by_slot.remove(&key).unwrap_or_default();
                if let Some(counts) = &scheduled_today {
                    for (pattern_id, has) in leaf.has_schedules_today_by_pattern.iter_mut() {
                        *has = counts.get(pattern_id).is_some_and(|&n| n > 0);
                    }
                }
            }
        }
    }
}

impl LeafBuilder {
    /// Whether the leaf earns a place on the board.
    ///
    /// A leaf is shown when it has a typical pattern no earlier stop
    /// served, or an upcoming trip on such a pattern, unless all its trips
    /// only let riders off here. On subway that last rule only applies at
    /// the typical terminus, so a temporary terminal still acknowledges
    /// the missing service.
    #[allow(clippy::too_many_arguments)]
    fn should_show(
        &self,
        stop: &Stop,
        line_or_route: &LineOrRoute,
        now: EasternTime,
        cutoff: Option<EasternTime>,
        show_all_while_loading: bool,
        all_data_loaded: bool,
        global: &GlobalData,
        config: &EngineConfig,
    ) -> bool {
        if !all_data_loaded && show_all_while_loading {
            return true;
        }
        let rows = if line_or_route.route_type() == RouteType::Bus {
            config.typical_leaf_rows
        } else {
            config.branching_leaf_rows
        };
        let has_unseen_upcoming_trip = self
            .upcoming_trips
            .iter()
            .filter(|t| match cutoff {
                Some(cutoff) => t.is_upcoming_within(now, cutoff),
                None => t.time().is_some_and(|time| time >= now),
            })
            .take(rows)
            .any(|t| {
                // Trips without a pattern can't have been seen elsewhere.
                t.trip
                    .route_pattern_id
                    .as_ref()
                    .is_none_or(|id| self.unseen.contains(id))
            });
        let has_unseen_typical_pattern = self
            .patterns
            .iter()
            .any(|p| p.is_typical() && self.unseen.contains(&p.id));

        let arrival_only = all_arrival_only(&self.upcoming_trips);
        let filtered_as_arrival_only = if line_or_route.is_subway() {
            arrival_only && self.is_typical_terminus(stop, global)
        } else {
            arrival_only
        };

        (has_unseen_typical_pattern || has_unseen_upcoming_trip) && !filtered_as_arrival_only
    }

    fn is_typical_terminus(&self, stop: &Stop, global: &GlobalData) -> bool {
        self.patterns.iter().filter(|p| p.is_typical()).all(|p| {
            global
                .trips
                .get(&p.representative_trip_id)
                .and_then(|t| t.last_stop())
                .is_some_and(|last| stop.is_family_member(last))
        })
    }
}

fn filter_irrelevant_data(
    cards: &mut Vec<CardBuilder>,
    request: &BoardRequest,
    all_data_loaded: bool,
    global: &GlobalData,
    config: &EngineConfig,
) {
    let context = request.context;
    let cutoff = context.non_typical_horizon(config).map(|h| request.now + h);
    for card in cards.iter_mut() {
        let line_or_route = &card.line_or_route;
        let drop_cancelled = context.hides_cancellations() || line_or_route.is_subway();
        for stop in &mut card.stops {
            let stop_ref = &stop.stop;
            stop.leaves.retain(|leaf| {
                leaf.should_show(
                    stop_ref,
                    line_or_route,
                    request.now,
                    cutoff,
                    context.is_stop_details(),
                    all_data_loaded,
                    global,
                    config,
                )
            });
            for leaf in &mut stop.leaves {
                leaf.upcoming_trips.retain(|t| {
                    !(drop_cancelled && t.is_cancelled()) && t.is_arrival_only() != Some(true)
                });
            }
        }
        card.stops.retain(|stop| !stop.leaves.is_empty());
    }
    cards.retain(|card| !card.stops.is_empty());
}

fn add_alerts(cards: &mut [CardBuilder], active: &[&Alert], context: Context, global: &GlobalData) {
    let threshold = context.alert_threshold();
    let relevant: Vec<&Alert> = active
        .iter()
        .copied()
        .filter(|a| a.significance() >= threshold)
        .collect();

    for card in cards {
        let route_ids: Vec<RouteId> = match &card.line_or_route {
            LineOrRoute::Line(grouped) => global
                .routes_for_line(&grouped.line.id)
                .into_iter()
                .map(|r| r.id.clone())
                .collect(),
            LineOrRoute::Route(route) => vec![route.id.clone()],
        };
        for stop in &mut card.stops {
            for leaf in &mut stop.leaves {
                let mut seen = HashSet::new();
                leaf.alerts_here = applicable_alerts(
                    relevant.iter().copied(),
                    Some(leaf.direction_id),
                    &route_ids,
                    Some(&leaf.stop_ids),
                    None,
                )
                .into_iter()
                .chain(elevator_alerts(relevant.iter().copied(), &leaf.stop_ids))
                .filter(|a| seen.insert(&a.id))
                .cloned()
                .collect();

                let patterns: Vec<&RoutePattern> = leaf.patterns.iter().collect();
                leaf.alerts_downstream = alerts_downstream_for_patterns(
                    &relevant,
                    &patterns,
                    &leaf.stop_ids,
                    &global.trips,
                )
                .into_iter()
                .cloned()
                .collect();
            }
        }
    }
}

fn build(cards: Vec<CardBuilder>, request: &BoardRequest, all_data_loaded: bool) -> Vec<RouteCard> {
    let position = request.position.as_ref();
    let mut built: Vec<RouteCard> = cards
        .into_iter()
        .map(|card| {
            let mut stop_data: Vec<RouteStopData> = card
                .stops
                .into_iter()
                .map(|stop| {
                    let mut leaves: Vec<Leaf> = stop
                        .leaves
                        .into_iter()
                        .filter_map(|leaf| {
                            let direction_id = leaf.direction_id;
                            Leaf::new(
                                card.line_or_route.clone(),
                                stop.stop.clone(),
                                direction_id,
                                leaf.patterns,
                                leaf.stop_ids,
                                leaf.upcoming_trips,
                                leaf.alerts_here,
                                all_data_loaded,
                                leaf.has_schedules_today_by_pattern,
                                leaf.alerts_downstream,
                                request.context,
                            )
                            .inspect_err(|err| tracing::warn!(error = %err, "dropping leaf"))
                            .ok()
                        })
                        .collect();
                    leaves.sort_by(compare_leaves_at_stop);
                    RouteStopData {
                        line_or_route: card.line_or_route.clone(),
                        stop: stop.stop,
                        directions: stop.directions,
                        data: leaves,
                    }
                })
                .collect();
            stop_data.sort_by(compare_stops_on_route(position));
            RouteCard {
                line_or_route: card.line_or_route,
                stop_data,
                at: request.now,
            }
        })
        .collect();
    built.sort_by(compare_route_cards(position, request.context, &request.pinned));
    built
}
