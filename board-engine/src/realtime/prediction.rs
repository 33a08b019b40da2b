//! Realtime predictions.

use crate::domain::{EasternTime, RouteId, StopId, TripId, VehicleId};

/// How a predicted call relates to the static schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRelationship {
    #[default]
    Scheduled,
    Skipped,
    Cancelled,
    Added,
    Unscheduled,
    NoData,
}

/// A predicted call of one trip at one stop.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Prediction {
    pub id: String,
    pub trip_id: TripId,
    pub route_id: RouteId,
    pub stop_id: StopId,
    pub stop_sequence: u32,
    #[serde(default)]
    pub arrival_time: Option<EasternTime>,
    #[serde(default)]
    pub departure_time: Option<EasternTime>,
    #[serde(default)]
    pub schedule_relationship: ScheduleRelationship,
    /// Free text that replaces any computed countdown, e.g. "Stopped 1 stop away".
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub vehicle_id: Option<VehicleId>,
}

impl Prediction {
    /// Departure if there is one, else arrival.
    pub fn stop_time(&self) -> Option<EasternTime> {
        self.departure_time.or(self.arrival_time)
    }

    pub fn is_cancelled(&self) -> bool {
        self.schedule_relationship == ScheduleRelationship::Cancelled
    }

    pub fn is_skipped(&self) -> bool {
        self.schedule_relationship == ScheduleRelationship::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal() {
        let json = r#"{"id": "p", "trip_id": "t", "route_id": "r", "stop_id": "s",
            "stop_sequence": 10, "schedule_relationship": "cancelled"}"#;
        let p: Prediction = serde_json::from_str(json).unwrap();
        assert!(p.is_cancelled());
        assert!(!p.is_skipped());
        assert!(p.stop_time().is_none());
        assert!(p.vehicle_id.is_none());
    }

    #[test]
    fn relationship_defaults_to_scheduled() {
        let json = r#"{"id": "p", "trip_id": "t", "route_id": "r", "stop_id": "s",
            "stop_sequence": 10, "arrival_time": "2024-03-19T12:00:00-04:00"}"#;
        let p: Prediction = serde_json::from_str(json).unwrap();
        assert_eq!(p.schedule_relationship, ScheduleRelationship::Scheduled);
        assert_eq!(p.stop_time().unwrap().to_string(), "12:00");
    }
}
