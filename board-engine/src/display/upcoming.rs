//! Upcoming trips: a trip paired with whatever schedule, prediction and
//! vehicle data is known for one stop.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::EngineConfig;
use crate::domain::{EasternTime, RouteId, RouteType, StopId, Trip, TripId, VehicleId};
use crate::global::GlobalData;
use crate::realtime::{Prediction, Schedule, StopEventType, Vehicle};

use super::TripInstantDisplay;

/// A trip's next call at a stop.
///
/// A prediction with no times (a skipped stop, a dropped trip) still
/// overrides the scheduled time, so [`UpcomingTrip::time`] may be `None`
/// even when a schedule exists.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct UpcomingTrip {
    pub trip: Trip,
    pub schedule: Option<Schedule>,
    pub prediction: Option<Prediction>,
    pub vehicle: Option<Vehicle>,
}

/// One departure row ready for display.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FormattedTrip {
    pub id: String,
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub headsign: String,
    pub format: TripInstantDisplay,
}

impl UpcomingTrip {
    pub fn new(trip: Trip) -> Self {
        Self {
            trip,
            schedule: None,
            prediction: None,
            vehicle: None,
        }
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn with_prediction(mut self, prediction: Prediction) -> Self {
        self.prediction = Some(prediction);
        self
    }

    pub fn with_vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicle = Some(vehicle);
        self
    }

    /// Trip id and stop sequence.
    pub fn id(&self) -> String {
        let sequence = self
            .prediction
            .as_ref()
            .map(|p| p.stop_sequence)
            .or(self.schedule.as_ref().map(|s| s.stop_sequence));
        match sequence {
            Some(sequence) => format!("{}-{}", self.trip.id, sequence),
            None => self.trip.id.to_string(),
        }
    }

    pub fn time(&self) -> Option<EasternTime> {
        match &self.prediction {
            Some(p) if !p.is_cancelled() && !(p.stop_time().is_none() && p.status.is_some()) => {
                p.stop_time()
            }
            _ => self.schedule.as_ref().and_then(Schedule::stop_time),
        }
    }

    /// The prediction's stop, which may be a platform, else the schedule's.
    pub fn stop_id(&self) -> Option<&StopId> {
        self.prediction
            .as_ref()
            .map(|p| &p.stop_id)
            .or(self.schedule.as_ref().map(|s| &s.stop_id))
    }

    pub fn headsign(&self) -> &str {
        &self.trip.headsign
    }

    /// A scheduled call that the prediction feed has cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.schedule.as_ref().and_then(Schedule::stop_time).is_some()
            && self.prediction.as_ref().is_some_and(Prediction::is_cancelled)
    }

    /// Upcoming before `cutoff`, or in the recent past while the vehicle is
    /// still at the stop or a status text is still set.
    pub fn is_upcoming_within(&self, now: EasternTime, cutoff: EasternTime) -> bool {
        let Some(time) = self.time() else {
            return false;
        };
        if time >= cutoff {
            return false;
        }
        if time >= now {
            return true;
        }
        self.prediction.as_ref().is_some_and(|p| {
            p.status.is_some()
                || self.vehicle.as_ref().and_then(|v| v.stop_id.as_ref()) == Some(&p.stop_id)
        })
    }

    /// Whether the trip only lets riders off here.
    ///
    /// `None` when the trip neither arrives nor departs, e.g. a dropped
    /// trip with no schedule.
    pub fn is_arrival_only(&self) -> Option<bool> {
        let (has_arrival, has_departure) = match (&self.schedule, &self.prediction) {
            (Some(s), _) => (
                s.drop_off_type != StopEventType::Unavailable,
                s.pick_up_type != StopEventType::Unavailable,
            ),
            (None, Some(p)) => (p.arrival_time.is_some(), p.departure_time.is_some()),
            (None, None) => (false, false),
        };
        if !has_arrival && !has_departure {
            None
        } else {
            Some(!has_departure)
        }
    }

    pub fn display(
        &self,
        now: EasternTime,
        allow_arrival_only: bool,
        config: &EngineConfig,
    ) -> TripInstantDisplay {
        TripInstantDisplay::classify(
            self.schedule.as_ref(),
            self.prediction.as_ref(),
            self.vehicle.as_ref(),
            now,
            allow_arrival_only,
            config,
        )
    }

    /// Format for display, or `None` if the trip should not be shown.
    ///
    /// Subway never shows bare scheduled times.
    pub fn format(
        &self,
        now: EasternTime,
        route_type: RouteType,
        allow_arrival_only: bool,
        config: &EngineConfig,
    ) -> Option<FormattedTrip> {
        let format = self.display(now, allow_arrival_only, config);
        if format.is_hidden() {
            return None;
        }
        if route_type.is_subway() && matches!(format, TripInstantDisplay::Schedule(_)) {
            return None;
        }
        Some(FormattedTrip {
            id: self.id(),
            trip_id: self.trip.id.clone(),
            route_id: self.trip.route_id.clone(),
            headsign: self.trip.headsign.clone(),
            format,
        })
    }

    /// Ordering by time, trips without a time last.
    pub fn cmp_by_time(&self, other: &Self) -> Ordering {
        match (self.time(), other.time()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| self.trip.id.cmp(&other.trip.id))
    }

    /// Pair schedules with predictions for the same call and attach trips
    /// and vehicles.
    ///
    /// Calls are matched by trip id, parent station and stop sequence, so a
    /// prediction on a platform meets a schedule on the station. Calls whose
    /// trip is unknown are dropped, as are schedule-only calls that already
    /// left before `now`. Predicted calls are kept regardless of time so a
    /// vehicle still at the stop can board.
    pub fn trips_from_data<'a>(
        global: &GlobalData,
        schedules: impl IntoIterator<Item = &'a Schedule>,
        predictions: impl IntoIterator<Item = &'a Prediction>,
        lookup_trip: impl Fn(&TripId) -> Option<&'a Trip>,
        vehicles: &HashMap<VehicleId, Vehicle>,
        now: EasternTime,
    ) -> Vec<UpcomingTrip> {
        type Key = (TripId, StopId, u32);
        let mut keys: Vec<Key> = Vec::new();
        let mut by_key: HashMap<Key, (Option<&Schedule>, Option<&Prediction>)> = HashMap::new();

        for schedule in schedules {
            let key = (
                schedule.trip_id.clone(),
                global.resolve_parent_id(&schedule.stop_id),
                schedule.stop_sequence,
            );
            let entry = by_key.entry(key.clone()).or_insert_with(|| {
                keys.push(key);
                (None, None)
            });
            entry.0 = Some(schedule);
        }
        for prediction in predictions {
            let key = (
                prediction.trip_id.clone(),
                global.resolve_parent_id(&prediction.stop_id),
                prediction.stop_sequence,
            );
            let entry = by_key.entry(key.clone()).or_insert_with(|| {
                keys.push(key);
                (None, None)
            });
            entry.1 = Some(prediction);
        }

        let mut trips: Vec<UpcomingTrip> = keys
            .iter()
            .filter_map(|key| {
                let (schedule, prediction) = by_key.get(key)?;
                let trip = lookup_trip(&key.0)?;
                let vehicle = prediction
                    .and_then(|p| p.vehicle_id.as_ref())
                    .and_then(|id| vehicles.get(id));
                Some(UpcomingTrip {
                    trip: trip.clone(),
                    schedule: schedule.cloned(),
                    prediction: prediction.cloned(),
                    vehicle: vehicle.cloned(),
                })
            })
            .filter(|upcoming| {
                if upcoming.prediction.is_some() {
                    return true;
                }
                match upcoming.schedule.as_ref().and_then(Schedule::stop_time) {
                    Some(time) => time >= now,
                    None => true,
                }
            })
            .collect();
        trips.sort_by(UpcomingTrip::cmp_by_time);
        trips
    }
}

/// True if the trips contain an arrival-only trip and no departing one.
pub fn all_arrival_only(trips: &[UpcomingTrip]) -> bool {
    let flags: Vec<bool> = trips.iter().filter_map(UpcomingTrip::is_arrival_only).collect();
    flags.contains(&true) && !flags.contains(&false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::trip_display::fixtures::{now, prediction, schedule, vehicle};
    use crate::global::fixtures::GlobalBuilder;
    use crate::realtime::{CurrentStatus, ScheduleRelationship};
    use chrono::Duration;

    fn trip(id: &str) -> Trip {
        Trip {
            id: TripId::new(id).unwrap(),
            route_id: RouteId::new("r").unwrap(),
            route_pattern_id: None,
            direction_id: 0,
            headsign: "Downtown".into(),
            stop_ids: Vec::new(),
            shape_id: None,
        }
    }

    fn mins(n: i64) -> Option<EasternTime> {
        Some(now() + Duration::minutes(n))
    }

    #[test]
    fn time_prefers_prediction() {
        let upcoming = UpcomingTrip::new(trip("t"))
            .with_schedule(schedule("t", "s", mins(5)))
            .with_prediction(prediction("t", "s", mins(7)));
        assert_eq!(upcoming.time(), mins(7));
    }

    #[test]
    fn timeless_prediction_overrides_schedule() {
        let mut p = prediction("t", "s", None);
        p.schedule_relationship = ScheduleRelationship::Skipped;
        let upcoming = UpcomingTrip::new(trip("t"))
            .with_schedule(schedule("t", "s", mins(5)))
            .with_prediction(p);
        assert_eq!(upcoming.time(), None);
    }

    #[test]
    fn cancelled_or_status_falls_back_to_schedule() {
        let mut p = prediction("t", "s", mins(7));
        p.schedule_relationship = ScheduleRelationship::Cancelled;
        let upcoming = UpcomingTrip::new(trip("t"))
            .with_schedule(schedule("t", "s", mins(5)))
            .with_prediction(p);
        assert_eq!(upcoming.time(), mins(5));
        assert!(upcoming.is_cancelled());

        let mut p = prediction("t", "s", None);
        p.status = Some("Delayed".into());
        let upcoming = UpcomingTrip::new(trip("t"))
            .with_schedule(schedule("t", "s", mins(5)))
            .with_prediction(p);
        assert_eq!(upcoming.time(), mins(5));
        assert!(!upcoming.is_cancelled());
    }

    #[test]
    fn upcoming_within_cutoff() {
        let upcoming = UpcomingTrip::new(trip("t")).with_prediction(prediction("t", "s", mins(10)));
        assert!(upcoming.is_upcoming_within(now(), now() + Duration::minutes(11)));
        assert!(!upcoming.is_upcoming_within(now(), now() + Duration::minutes(10)));
    }

    #[test]
    fn recent_past_kept_while_vehicle_at_stop() {
        let past = UpcomingTrip::new(trip("t")).with_prediction(prediction("t", "s", mins(-1)));
        let cutoff = now() + Duration::minutes(30);
        assert!(!past.is_upcoming_within(now(), cutoff));

        let at_stop = past.clone().with_vehicle(vehicle("t", "s", CurrentStatus::StoppedAt));
        assert!(at_stop.is_upcoming_within(now(), cutoff));

        let elsewhere = past.with_vehicle(vehicle("t", "x", CurrentStatus::StoppedAt));
        assert!(!elsewhere.is_upcoming_within(now(), cutoff));
    }

    #[test]
    fn arrival_only_from_schedule_or_prediction() {
        let mut s = schedule("t", "s", mins(5));
        s.pick_up_type = StopEventType::Unavailable;
        let upcoming = UpcomingTrip::new(trip("t")).with_schedule(s);
        assert_eq!(upcoming.is_arrival_only(), Some(true));

        let mut p = prediction("t", "s", None);
        p.arrival_time = mins(5);
        let upcoming = UpcomingTrip::new(trip("t")).with_prediction(p);
        assert_eq!(upcoming.is_arrival_only(), Some(true));

        let departing = UpcomingTrip::new(trip("u")).with_prediction(prediction("u", "s", mins(5)));
        assert_eq!(departing.is_arrival_only(), Some(false));

        let dropped = UpcomingTrip::new(trip("v")).with_prediction(prediction("v", "s", None));
        assert_eq!(dropped.is_arrival_only(), None);

        assert!(all_arrival_only(&[upcoming.clone(), dropped.clone()]));
        assert!(!all_arrival_only(&[upcoming, departing]));
        assert!(!all_arrival_only(&[dropped]));
    }

    #[test]
    fn format_hides_schedules_on_subway() {
        let upcoming = UpcomingTrip::new(trip("t")).with_schedule(schedule("t", "s", mins(10)));
        let config = EngineConfig::default();

        assert!(upcoming.format(now(), RouteType::HeavyRail, false, &config).is_none());
        let bus = upcoming.format(now(), RouteType::Bus, false, &config).unwrap();
        assert_eq!(bus.format, TripInstantDisplay::Schedule(mins(10).unwrap()));
        assert_eq!(bus.id, "t-1");
    }

    #[test]
    fn trips_from_data_matches_platform_to_station() {
        let mut b = GlobalBuilder::new();
        b.station("place-a", &["a1", "a2"]);
        let global = b.build();

        let trips: HashMap<TripId, Trip> = ["t1", "t2", "t3"]
            .into_iter()
            .map(|id| (TripId::new(id).unwrap(), trip(id)))
            .collect();
        let schedules = vec![
            schedule("t1", "place-a", mins(10)),
            schedule("t2", "place-a", mins(5)),
            schedule("t3", "place-a", mins(-5)),
            schedule("unknown", "place-a", mins(1)),
        ];
        let mut p = prediction("t1", "a1", mins(8));
        p.vehicle_id = Some(VehicleId::new("v-t1").unwrap());
        let predictions = vec![p];
        let vehicles: HashMap<VehicleId, Vehicle> =
            [vehicle("t1", "a1", CurrentStatus::InTransitTo)]
                .into_iter()
                .map(|v| (v.id.clone(), v))
                .collect();

        let upcoming = UpcomingTrip::trips_from_data(
            &global,
            &schedules,
            &predictions,
            |id| trips.get(id),
            &vehicles,
            now(),
        );
        let ids: Vec<_> = upcoming.iter().map(|u| u.trip.id.as_str()).collect();
        assert_eq!(ids, vec!["t2", "t1"]);
        assert!(upcoming[1].schedule.is_some());
        assert!(upcoming[1].prediction.is_some());
        assert!(upcoming[1].vehicle.is_some());
        assert_eq!(upcoming[1].time(), mins(8));
    }
}
