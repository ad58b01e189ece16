//! Park-and-ride journey planner.
//!
//! Answers "I want to leave from here at this time, where should I park
//! and which train or bus should I take?". Every parking near the
//! destination becomes a candidate; the cheapest and quickest survive.

mod compose;
mod config;
mod plan;
mod select;

pub use compose::{compose, transit_depart_after};
pub use config::PlannerConfig;
pub use plan::{AddressPlan, PlanError, Planner};
pub use select::select_journeys;
