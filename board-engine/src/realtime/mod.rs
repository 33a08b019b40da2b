//! Realtime feed snapshots: schedules, predictions, vehicles and alerts.

pub(crate) mod alert;
mod prediction;
mod response;
mod schedule;
mod vehicle;

pub use alert::{
    ActivePeriod, Activity, Alert, AlertSignificance, Cause, DurationCertainty, Effect,
    EntityPredicate, InformedEntity, RecurrenceRange, alerts_downstream_for_patterns,
    applicable_alerts, downstream_alerts, elevator_alerts,
};
pub use prediction::{Prediction, ScheduleRelationship};
pub use response::{
    AlertsResponse, PredictionsFeed, PredictionsResponse, ScheduleFeed, ScheduleResponse,
    VehiclesResponse,
};
pub use schedule::{Schedule, StopEventType};
pub use vehicle::{CurrentStatus, Vehicle};
