//! Classifying one upcoming trip into a rider-facing display state.
//!
//! The rules are applied in priority order:
//!
//! 1. **Override**: a prediction with a status string shows that text.
//! 2. **Skipped**: shows the scheduled time struck out, or nothing without
//!    a schedule.
//! 3. **Cancelled**: hidden.
//! 4. **Usable time**: the departure (or, when allowed, the arrival of an
//!    arrival-only trip) from the prediction if there is one, else the
//!    schedule. Times already past are not usable.
//! 5. **Boarding**: the vehicle is stopped at this stop on this trip and
//!    leaves within the boarding cutoff.
//! 6. **Countdown**: arriving, approaching, minutes, or a clock time for
//!    distant and schedule-only departures.

use crate::config::EngineConfig;
use crate::domain::EasternTime;
use crate::realtime::{Prediction, Schedule, Vehicle};

/// How a single departure is presented.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TripInstantDisplay {
    /// Free text from the prediction feed.
    Overridden(String),
    /// Nothing should be shown.
    Hidden,
    /// The trip skips this stop. Carries the scheduled time, if known.
    Skipped(Option<EasternTime>),
    Boarding,
    Arriving,
    Approaching,
    Minutes(i64),
    /// Scheduled clock time, no realtime data.
    Schedule(EasternTime),
    /// Predicted clock time, too far out for a countdown.
    DistantFuture(EasternTime),
}

impl TripInstantDisplay {
    /// Classify a trip at a stop.
    pub fn classify(
        schedule: Option<&Schedule>,
        prediction: Option<&Prediction>,
        vehicle: Option<&Vehicle>,
        now: EasternTime,
        allow_arrival_only: bool,
        config: &EngineConfig,
    ) -> Self {
        if let Some(status) = prediction.and_then(|p| p.status.as_ref()) {
            return TripInstantDisplay::Overridden(status.clone());
        }

        if let Some(prediction) = prediction {
            if prediction.is_skipped() {
                return match schedule {
                    Some(schedule) => TripInstantDisplay::Skipped(schedule.stop_time()),
                    None => TripInstantDisplay::Hidden,
                };
            }
            if prediction.is_cancelled() {
                return TripInstantDisplay::Hidden;
            }
        }

        let (arrival, departure) = match (prediction, schedule) {
            (Some(p), _) => (p.arrival_time, p.departure_time),
            (None, Some(s)) => (s.arrival_time, s.departure_time),
            (None, None) => return TripInstantDisplay::Hidden,
        };
        let time = match departure {
            Some(departure) => Some(departure),
            None if allow_arrival_only => arrival,
            None => None,
        };
        let Some(time) = time.filter(|t| *t >= now) else {
            return TripInstantDisplay::Hidden;
        };

        let remaining = time - now;

        if let (Some(prediction), Some(vehicle)) = (prediction, vehicle)
            && vehicle.is_stopped_at(&prediction.stop_id, &prediction.trip_id)
            && remaining <= config.boarding_cutoff()
        {
            return TripInstantDisplay::Boarding;
        }

        let seconds = remaining.num_seconds();
        if seconds < config.arrival_cutoff_secs {
            return TripInstantDisplay::Arriving;
        }
        if seconds < config.approach_cutoff_secs {
            return TripInstantDisplay::Approaching;
        }

        let minutes = (seconds + 30).div_euclid(60);
        if minutes >= config.distant_future_mins {
            return TripInstantDisplay::DistantFuture(time);
        }
        if prediction.is_none() {
            return TripInstantDisplay::Schedule(time);
        }
        TripInstantDisplay::Minutes(minutes)
    }

    /// True for states that should never reach the rider.
    pub fn is_hidden(&self) -> bool {
        matches!(self, TripInstantDisplay::Hidden | TripInstantDisplay::Skipped(_))
    }
}



#[cfg(test)]
mod proptests {
    use super::fixtures::*;
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn status_always_overrides(status in "[a-zA-Z ]{1,20}", offset in -7200i64..7200) {
            let mut p = prediction("t", "s", Some(now() + Duration::seconds(offset)));
            p.status = Some(status.clone());
            let config = EngineConfig::default();
            let display = TripInstantDisplay::classify(None, Some(&p), None, now(), false, &config);
            prop_assert_eq!(display, TripInstantDisplay::Overridden(status));
        }

        #[test]
        fn past_departures_are_hidden(offset in 1i64..100_000, scheduled in any::<bool>()) {
            let past = Some(now() - Duration::seconds(offset));
            let s = schedule("t", "s", past);
            let p = prediction("t", "s", past);
            let config = EngineConfig::default();
            let display = if scheduled {
                TripInstantDisplay::classify(Some(&s), None, None, now(), true, &config)
            } else {
                TripInstantDisplay::classify(Some(&s), Some(&p), None, now(), true, &config)
            };
            prop_assert_eq!(display, TripInstantDisplay::Hidden);
        }

        #[test]
        fn minutes_never_below_one_or_beyond_cutoff(offset in 0i64..10_000) {
            let p = prediction("t", "s", Some(now() + Duration::seconds(offset)));
            let config = EngineConfig::default();
            let display = TripInstantDisplay::classify(None, Some(&p), None, now(), false, &config);
            if let TripInstantDisplay::Minutes(n) = display {
                prop_assert!(n >= 1);
                prop_assert!(n < 60);
            }
        }
    }
}
