//! Scheduled stop times.

use crate::domain::{EasternTime, RouteId, StopId, TripId};

/// Whether riders can board or alight at a scheduled stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopEventType {
    #[default]
    Regular,
    Unavailable,
    CallAgency,
    CoordinateWithDriver,
}

/// One trip's scheduled call at one stop.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Schedule {
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub stop_id: StopId,
    pub stop_sequence: u32,
    #[serde(default)]
    pub arrival_time: Option<EasternTime>,
    #[serde(default)]
    pub departure_time: Option<EasternTime>,
    #[serde(default)]
    pub pick_up_type: StopEventType,
    #[serde(default)]
    pub drop_off_type: StopEventType,
}

impl Schedule {
    /// Departure if there is one, else arrival.
    pub fn stop_time(&self) -> Option<EasternTime> {
        self.departure_time.or(self.arrival_time)
    }

    /// No boarding here: the trip only lets riders off.
    pub fn is_arrival_only(&self) -> bool {
        self.pick_up_type == StopEventType::Unavailable
            && self.drop_off_type != StopEventType::Unavailable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(arrival: Option<&str>, departure: Option<&str>) -> Schedule {
        Schedule {
            trip_id: TripId::new("t").unwrap(),
            route_id: RouteId::new("r").unwrap(),
            stop_id: StopId::new("s").unwrap(),
            stop_sequence: 1,
            arrival_time: arrival.map(|t| EasternTime::parse_rfc3339(t).unwrap()),
            departure_time: departure.map(|t| EasternTime::parse_rfc3339(t).unwrap()),
            pick_up_type: StopEventType::Regular,
            drop_off_type: StopEventType::Regular,
        }
    }

    #[test]
    fn stop_time_prefers_departure() {
        let s = schedule(
            Some("2024-03-19T12:00:00-04:00"),
            Some("2024-03-19T12:01:00-04:00"),
        );
        assert_eq!(s.stop_time().unwrap().to_string(), "12:01");

        let s = schedule(Some("2024-03-19T12:00:00-04:00"), None);
        assert_eq!(s.stop_time().unwrap().to_string(), "12:00");

        assert!(schedule(None, None).stop_time().is_none());
    }

    #[test]
    fn arrival_only_from_pick_up_type() {
        let mut s = schedule(Some("2024-03-19T12:00:00-04:00"), None);
        assert!(!s.is_arrival_only());
        s.pick_up_type = StopEventType::Unavailable;
        assert!(s.is_arrival_only());
        s.drop_off_type = StopEventType::Unavailable;
        assert!(!s.is_arrival_only());
    }

    #[test]
    fn deserialize_defaults() {
        let json = r#"{"trip_id": "t", "route_id": "r", "stop_id": "s", "stop_sequence": 4,
            "departure_time": "2024-03-19T12:00:00-04:00"}"#;
        let s: Schedule = serde_json::from_str(json).unwrap();
        assert_eq!(s.pick_up_type, StopEventType::Regular);
        assert!(s.arrival_time.is_none());
        assert_eq!(s.stop_sequence, 4);
    }
}
