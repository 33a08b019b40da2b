//! Ordering for leaves, stops and route cards.
//!
//! Every comparator ends on an id, so sorting is total and the output
//! does not depend on the order data arrived in.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::cards::{Context, Leaf, RouteCard, RouteStopData};
use crate::domain::Position;

/// How much a leaf has to show. Lower sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum ServiceTier {
    /// Upcoming trips or any alert
    Active,
    /// Nothing upcoming, but something ran earlier today
    ScheduledToday,
    None,
}

fn leaf_tier(leaf: &Leaf) -> ServiceTier {
    if leaf.has_service() {
        ServiceTier::Active
    } else if leaf.has_schedules_today() {
        ServiceTier::ScheduledToday
    } else {
        ServiceTier::None
    }
}

fn card_tier(card: &RouteCard) -> ServiceTier {
    card.stop_data
        .iter()
        .flat_map(|stop| &stop.data)
        .map(leaf_tier)
        .min()
        .unwrap_or(ServiceTier::None)
}

/// `None` ties with everything.
fn compare_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => Ordering::Equal,
    }
}

/// Leaves at one stop: by service tier, then direction, then the lowest
/// sort order among their patterns.
pub fn compare_leaves_at_stop(a: &Leaf, b: &Leaf) -> Ordering {
    leaf_tier(a)
        .cmp(&leaf_tier(b))
        .then_with(|| a.direction_id.cmp(&b.direction_id))
        .then_with(|| {
            let order = |leaf: &Leaf| leaf.min_pattern_sort_order().unwrap_or(i32::MAX);
            order(a).cmp(&order(b))
        })
}

fn stop_has_service(stop: &RouteStopData) -> bool {
    stop.data.iter().any(Leaf::has_service)
}

/// Stops on one card: those with service first, then nearest to
/// `position`, then by stop id.
pub fn compare_stops_on_route(
    position: Option<&Position>,
) -> impl Fn(&RouteStopData, &RouteStopData) -> Ordering {
    move |a, b| {
        stop_has_service(b)
            .cmp(&stop_has_service(a))
            .then_with(|| {
                compare_distance(
                    position.map(|p| a.stop.distance_from(p)),
                    position.map(|p| b.stop.distance_from(p)),
                )
            })
            .then_with(|| a.stop.id.cmp(&b.stop.id))
    }
}

/// Route cards, by the following criteria in order:
/// 1. Pinned cards first
/// 2. Best service tier among the card's leaves
/// 3. Subway before other modes
/// 4. Distance from `position` to the card's first stop
/// 5. Sort order of the card's sort route
/// 6. Card id
///
/// `context` is accepted so every board view shares one signature; the
/// ordering is currently the same in each.
pub fn compare_route_cards<'p>(
    position: Option<&'p Position>,
    _context: Context,
    pinned: &'p HashSet<String>,
) -> impl Fn(&RouteCard, &RouteCard) -> Ordering + 'p {
    move |a, b| {
        pinned
            .contains(b.id())
            .cmp(&pinned.contains(a.id()))
            .then_with(|| card_tier(a).cmp(&card_tier(b)))
            .then_with(|| {
                b.line_or_route
                    .is_subway()
                    .cmp(&a.line_or_route.is_subway())
            })
            .then_with(|| {
                compare_distance(
                    position.and_then(|p| a.distance_from(p)),
                    position.and_then(|p| b.distance_from(p)),
                )
            })
            .then_with(|| {
                a.line_or_route
                    .sort_route()
                    .sort_order
                    .cmp(&b.line_or_route.sort_route().sort_order)
            })
            .then_with(|| a.id().cmp(b.id()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::cards::LineOrRoute;
    use crate::cards::route_card::fixtures::{leaf, with_alerts, with_trips};
    use crate::display::UpcomingTrip;
    use crate::display::trip_display::fixtures::{now, prediction};
    use crate::domain::{RouteType, Stop, Trip, Typicality};
    use crate::global::fixtures::{GlobalBuilder, pattern_id, route_id, trip_id};
    use crate::realtime::Effect;
    use crate::realtime::alert::fixtures::{ALL, alert, entity};

    fn upcoming() -> UpcomingTrip {
        UpcomingTrip::new(Trip {
            id: trip_id("t"),
            route_id: route_id("r"),
            route_pattern_id: Some(pattern_id("p0")),
            direction_id: 0,
            headsign: "Out".into(),
            stop_ids: Vec::new(),
            shape_id: None,
        })
        .with_prediction(prediction("t", "s", Some(now())))
    }

    /// Leaves in canonical order: served or alerted by direction, scheduled
    /// earlier, then by direction and pattern order among the unserved.
    fn canonical_leaves() -> Vec<Leaf> {
        let mut b = GlobalBuilder::new();
        let stop = b.stop("s", 0.0, 0.0);
        let route = b.route("r", RouteType::Bus, 1);
        let p = |b: &mut GlobalBuilder, id: &str, dir: u8, order: i32| {
            b.pattern(id, "r", dir, Typicality::Typical, order, "H", &["s"])
        };
        let (p0, p1, p2, p3, p4, p5) = (
            p(&mut b, "p0", 1, 5),
            p(&mut b, "p1", 1, 1),
            p(&mut b, "p2", 0, 9),
            p(&mut b, "p3", 0, 2),
            p(&mut b, "p4", 1, 3),
            p(&mut b, "p5", 0, 7),
        );
        let lor = LineOrRoute::Route(route);

        let served = with_trips(leaf(lor.clone(), stop.clone(), 1, vec![p0]), vec![upcoming()]);
        let mut earlier = leaf(lor.clone(), stop.clone(), 1, vec![p1]);
        earlier
            .has_schedules_today_by_pattern
            .insert(pattern_id("p1"), true);
        let change = alert(
            "change",
            Effect::ServiceChange,
            vec![entity(ALL, Some("r"), None, Some("s"))],
        );
        let alerted = with_alerts(
            leaf(lor.clone(), stop.clone(), 0, vec![p5]),
            vec![change],
            vec![],
        );
        vec![
            alerted,
            served,
            earlier,
            leaf(lor.clone(), stop.clone(), 0, vec![p3]),
            leaf(lor.clone(), stop.clone(), 0, vec![p2]),
            leaf(lor, stop, 1, vec![p4]),
        ]
    }

    #[test]
    fn leaves_sort_from_reversed() {
        let canonical = canonical_leaves();
        let mut leaves = canonical.clone();
        leaves.reverse();
        leaves.sort_by(compare_leaves_at_stop);
        assert_eq!(leaves, canonical);
    }

    fn stop_data(stop: Stop, leaves: Vec<Leaf>) -> RouteStopData {
        RouteStopData {
            line_or_route: leaves[0].line_or_route.clone(),
            stop,
            directions: Vec::new(),
            data: leaves,
        }
    }

    #[test]
    fn stops_sort_from_reversed() {
        let mut b = GlobalBuilder::new();
        let route = b.route("r", RouteType::Bus, 1);
        let near = b.stop("near", 0.0, 0.001);
        let far = b.stop("far", 0.0, 0.01);
        let tie_a = b.stop("tie-a", 0.0, 0.02);
        let tie_b = b.stop("tie-b", 0.0, 0.02);
        let served = b.stop("served", 0.0, 0.05);
        let pattern = b.pattern("p0", "r", 0, Typicality::Typical, 1, "Out", &["near"]);
        let lor = LineOrRoute::Route(route);
        let data = |stop: &Stop, trips: Vec<UpcomingTrip>| {
            stop_data(
                stop.clone(),
                vec![with_trips(leaf(lor.clone(), stop.clone(), 0, vec![pattern.clone()]), trips)],
            )
        };

        let canonical = vec![
            data(&served, vec![upcoming()]),
            data(&near, vec![]),
            data(&far, vec![]),
            data(&tie_a, vec![]),
            data(&tie_b, vec![]),
        ];
        let origin = Position::new(0.0, 0.0);
        let mut stops = canonical.clone();
        stops.reverse();
        stops.sort_by(compare_stops_on_route(Some(&origin)));
        assert_eq!(stops, canonical);

        // Without a position only service and id decide.
        stops.sort_by(compare_stops_on_route(None));
        let ids: Vec<_> = stops.iter().map(|s| s.stop.id.as_str()).collect();
        assert_eq!(ids, vec!["served", "far", "near", "tie-a", "tie-b"]);
    }

    #[test]
    fn route_cards_sort_from_reversed() {
        let mut b = GlobalBuilder::new();
        let stop_near = b.stop("near", 0.0, 0.001);
        let stop_far = b.stop("far", 0.0, 0.01);
        let routes = [
            b.route("pinned-bus", RouteType::Bus, 50),
            b.route("served-bus", RouteType::Bus, 40),
            b.route("red", RouteType::HeavyRail, 10),
            b.route("near-bus", RouteType::Bus, 30),
            b.route("far-bus-1", RouteType::Bus, 1),
            b.route("far-bus-2", RouteType::Bus, 2),
        ];
        let card = |route: &crate::domain::Route, stop: &Stop, trips: Vec<UpcomingTrip>| {
            let pattern = crate::domain::RoutePattern {
                id: pattern_id("p0"),
                route_id: route.id.clone(),
                direction_id: 0,
                name: String::new(),
                typicality: Typicality::Typical,
                sort_order: 1,
                representative_trip_id: trip_id("p0-rep"),
            };
            let lor = LineOrRoute::Route(route.clone());
            RouteCard {
                line_or_route: lor.clone(),
                stop_data: vec![stop_data(
                    stop.clone(),
                    vec![with_trips(leaf(lor, stop.clone(), 0, vec![pattern]), trips)],
                )],
                at: now(),
            }
        };

        let canonical = vec![
            card(&routes[0], &stop_far, vec![]),
            card(&routes[1], &stop_far, vec![upcoming()]),
            card(&routes[2], &stop_far, vec![]),
            card(&routes[3], &stop_near, vec![]),
            card(&routes[4], &stop_far, vec![]),
            card(&routes[5], &stop_far, vec![]),
        ];
        let origin = Position::new(0.0, 0.0);
        let pinned = HashSet::from(["pinned-bus".to_string()]);
        let mut cards = canonical.clone();
        cards.reverse();
        cards.sort_by(compare_route_cards(Some(&origin), Context::NearbyTransit, &pinned));
        assert_eq!(cards, canonical);
    }
}
