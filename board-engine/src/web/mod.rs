//! Web layer for the departure board engine.
//!
//! Serves boards and stop status from the latest feeds, and accepts
//! replacement feed snapshots.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
