//! Web layer for the park-and-ride planner.
//!
//! Provides JSON endpoints for planning journeys by coordinate or address.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
