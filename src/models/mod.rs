//! Defines the data structures and models used throughout the application.
//!
//! This includes rows stored in the database (flights, passengers, reservations),
//! validated inputs awaiting insertion, and aggregates used for display.

mod flight;
mod reservation;

pub use flight::*;
pub use reservation::*;
