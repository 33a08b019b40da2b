//! Domain types for the departure board engine.
//!
//! This module contains the static reference model: identifiers, stops,
//! routes, lines, route patterns, trips and the time and position types the
//! rest of the engine reasons with. Types validate their invariants at
//! construction time, so code that receives them can trust their validity.

mod error;
mod ids;
mod pattern;
mod position;
mod route;
mod stop;
mod time;
mod trip;

pub use error::DomainError;
pub use ids::{
    AlertId, InvalidId, LineId, RouteId, RoutePatternId, ShapeId, StopId, TripId, VehicleId,
};
pub use pattern::{RoutePattern, Typicality};
pub use position::Position;
pub use route::{Direction, Line, Route, RouteType};
pub use stop::{LocationType, Stop};
pub use time::{EasternTime, SERVICE_DAY_START_HOUR, ServiceDateRounding, TimeError};
pub use trip::{Shape, Trip};
