//! Where alerts apply and how to describe them.

mod association;
mod summary;

pub use association::{AlertAssociatedStop, StopServiceStatus, alerts_by_stop};
pub use summary::{
    AlertSummary, Location, RangeEnd, RangeStart, Recurrence, RecurrenceEnd, Timeframe, Update,
};
