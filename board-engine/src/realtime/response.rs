//! Whole-feed snapshots.
//!
//! Each feed arrives as one JSON document and replaces the previous one
//! wholesale. The snapshot types index their contents on construction so
//! lookups during a pass are cheap.

use std::collections::HashMap;

use crate::domain::{AlertId, EasternTime, RoutePatternId, StopId, Trip, TripId, VehicleId};

use super::{Alert, Prediction, Schedule, Vehicle};

type Index = HashMap<TripId, Vec<usize>>;
type StopTripIndex = HashMap<(StopId, TripId), Vec<usize>>;

fn index_by<T>(items: &[T], key: impl Fn(&T) -> (StopId, TripId)) -> (Index, StopTripIndex) {
    let mut by_trip: Index = HashMap::new();
    let mut by_stop_trip: StopTripIndex = HashMap::new();
    for (i, item) in items.iter().enumerate() {
        let (stop_id, trip_id) = key(item);
        by_trip.entry(trip_id.clone()).or_default().push(i);
        by_stop_trip.entry((stop_id, trip_id)).or_default().push(i);
    }
    (by_trip, by_stop_trip)
}

/// Wire form of [`ScheduleResponse`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ScheduleFeed {
    pub schedules: Vec<Schedule>,
    pub trips: HashMap<TripId, Trip>,
}

/// Today's schedules and the trips they belong to.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "ScheduleFeed")]
pub struct ScheduleResponse {
    pub schedules: Vec<Schedule>,
    pub trips: HashMap<TripId, Trip>,
    #[serde(skip)]
    by_trip: Index,
    #[serde(skip)]
    by_stop_trip: StopTripIndex,
}

impl From<ScheduleFeed> for ScheduleResponse {
    fn from(feed: ScheduleFeed) -> Self {
        Self::new(feed.schedules, feed.trips)
    }
}

impl ScheduleResponse {
    pub fn new(schedules: Vec<Schedule>, trips: HashMap<TripId, Trip>) -> Self {
        let (by_trip, by_stop_trip) =
            index_by(&schedules, |s| (s.stop_id.clone(), s.trip_id.clone()));
        Self {
            schedules,
            trips,
            by_trip,
            by_stop_trip,
        }
    }

    pub fn for_trip(&self, trip_id: &TripId) -> impl Iterator<Item = &Schedule> {
        self.by_trip
            .get(trip_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.schedules[i])
    }

    pub fn at(&self, stop_id: &StopId, trip_id: &TripId) -> impl Iterator<Item = &Schedule> {
        self.by_stop_trip
            .get(&(stop_id.clone(), trip_id.clone()))
            .into_iter()
            .flatten()
            .map(|&i| &self.schedules[i])
    }

    /// Number of scheduled calls today on each route pattern.
    pub fn schedules_today_by_pattern(&self) -> HashMap<RoutePatternId, usize> {
        let mut counts = HashMap::new();
        for schedule in &self.schedules {
            if let Some(pattern_id) = self
                .trips
                .get(&schedule.trip_id)
                .and_then(|t| t.route_pattern_id.clone())
            {
                *counts.entry(pattern_id).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Wire form of [`PredictionsResponse`].
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PredictionsFeed {
    pub predictions: Vec<Prediction>,
    pub trips: HashMap<TripId, Trip>,
    pub vehicles: HashMap<VehicleId, Vehicle>,
}

/// Live predictions with the trips and vehicles they reference.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(from = "PredictionsFeed")]
pub struct PredictionsResponse {
    pub predictions: Vec<Prediction>,
    pub trips: HashMap<TripId, Trip>,
    pub vehicles: HashMap<VehicleId, Vehicle>,
    #[serde(skip)]
    by_trip: Index,
    #[serde(skip)]
    by_stop_trip: StopTripIndex,
}

impl From<PredictionsFeed> for PredictionsResponse {
    fn from(feed: PredictionsFeed) -> Self {
        Self::new(feed.predictions, feed.trips, feed.vehicles)
    }
}

impl PredictionsResponse {
    pub fn new(
        predictions: Vec<Prediction>,
        trips: HashMap<TripId, Trip>,
        vehicles: HashMap<VehicleId, Vehicle>,
    ) -> Self {
        let (by_trip, by_stop_trip) =
            index_by(&predictions, |p| (p.stop_id.clone(), p.trip_id.clone()));
        Self {
            predictions,
            trips,
            vehicles,
            by_trip,
            by_stop_trip,
        }
    }

    pub fn for_trip(&self, trip_id: &TripId) -> impl Iterator<Item = &Prediction> {
        self.by_trip
            .get(trip_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.predictions[i])
    }

    pub fn at(&self, stop_id: &StopId, trip_id: &TripId) -> impl Iterator<Item = &Prediction> {
        self.by_stop_trip
            .get(&(stop_id.clone(), trip_id.clone()))
            .into_iter()
            .flatten()
            .map(|&i| &self.predictions[i])
    }
}

/// Latest vehicle positions.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct VehiclesResponse {
    pub vehicles: HashMap<VehicleId, Vehicle>,
}

/// Current service alerts.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AlertsResponse {
    pub alerts: HashMap<AlertId, Alert>,
}

impl AlertsResponse {
    /// Alerts active at `now`, ordered by id.
    pub fn active(&self, now: EasternTime) -> Vec<&Alert> {
        let mut active: Vec<_> = self.alerts.values().filter(|a| a.is_active(now)).collect();
        active.sort_by(|a, b| a.id.cmp(&b.id));
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realtime::alert::fixtures::{alert, entity, time, ALL};
    use crate::realtime::Effect;

    const SCHEDULES: &str = r#"{
        "schedules": [
            {"trip_id": "t1", "route_id": "r", "stop_id": "a", "stop_sequence": 1,
             "departure_time": "2024-03-19T12:00:00-04:00"},
            {"trip_id": "t1", "route_id": "r", "stop_id": "b", "stop_sequence": 2,
             "departure_time": "2024-03-19T12:05:00-04:00"},
            {"trip_id": "t2", "route_id": "r", "stop_id": "a", "stop_sequence": 1,
             "departure_time": "2024-03-19T12:10:00-04:00"}
        ],
        "trips": {
            "t1": {"id": "t1", "route_id": "r", "route_pattern_id": "p1", "direction_id": 0,
                   "headsign": "B"},
            "t2": {"id": "t2", "route_id": "r", "route_pattern_id": "p2", "direction_id": 0,
                   "headsign": "B"}
        }
    }"#;

    #[test]
    fn schedule_indexes_are_built_on_deserialize() {
        let response: ScheduleResponse = serde_json::from_str(SCHEDULES).unwrap();
        let t1 = TripId::new("t1").unwrap();
        let a = StopId::new("a").unwrap();

        assert_eq!(response.for_trip(&t1).count(), 2);
        assert_eq!(response.at(&a, &t1).count(), 1);
        assert_eq!(response.at(&a, &TripId::new("zzz").unwrap()).count(), 0);
    }

    #[test]
    fn schedules_today_by_pattern_counts() {
        let response: ScheduleResponse = serde_json::from_str(SCHEDULES).unwrap();
        let counts = response.schedules_today_by_pattern();
        assert_eq!(counts[&RoutePatternId::new("p1").unwrap()], 2);
        assert_eq!(counts[&RoutePatternId::new("p2").unwrap()], 1);
    }

    #[test]
    fn predictions_deserialize_with_vehicles() {
        let json = r#"{
            "predictions": [{"id": "p", "trip_id": "t1", "route_id": "r", "stop_id": "a",
                "stop_sequence": 1, "vehicle_id": "v1"}],
            "vehicles": {"v1": {"id": "v1", "current_status": "stopped_at",
                "latitude": 0.0, "longitude": 0.0}}
        }"#;
        let response: PredictionsResponse = serde_json::from_str(json).unwrap();
        let t1 = TripId::new("t1").unwrap();
        assert_eq!(response.for_trip(&t1).count(), 1);
        assert!(response.vehicles.contains_key("v1"));
        assert!(response.trips.is_empty());
    }

    #[test]
    fn active_alerts_sorted_by_id() {
        let mut expired = alert("a", Effect::Suspension, vec![entity(ALL, None, None, None)]);
        expired.active_period[0].end = Some(time("2024-03-19T01:00:00-04:00"));
        let alerts = [
            alert("c", Effect::Shuttle, vec![]),
            alert("b", Effect::Delay, vec![]),
            expired,
        ];
        let response = AlertsResponse {
            alerts: alerts.into_iter().map(|a| (a.id.clone(), a)).collect(),
        };

        let active = response.active(time("2024-03-19T12:00:00-04:00"));
        let ids: Vec<_> = active.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }
}
