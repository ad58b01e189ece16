//! Park-and-ride journey planner server.
//!
//! Answers: "I'm driving to this place, where should I leave the car
//! and continue by public transport?"

pub mod domain;
pub mod geo;
pub mod parking;
pub mod planner;
pub mod providers;
pub mod web;
