//! Flight records and the aggregates derived from them.

use chrono::NaiveDateTime;
use serde::Serialize;

/// A scheduled flight as stored in the `flights` table.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Flight {
    pub flight_id: i32,
    pub airline_name: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_datetime: NaiveDateTime,
    pub arrival_datetime: NaiveDateTime,
    /// Maximum number of confirmed reservations (always positive).
    pub max_capacity: i32,
}

/// A validated flight that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFlight {
    pub airline_name: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_datetime: NaiveDateTime,
    pub arrival_datetime: NaiveDateTime,
    pub max_capacity: i32,
}

/// One row of the flight listing: the flight plus its confirmed booking count.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct FlightListing {
    pub flight_id: i32,
    pub airline_name: String,
    pub flight_number: String,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_datetime: NaiveDateTime,
    pub arrival_datetime: NaiveDateTime,
    pub max_capacity: i32,
    pub booked: i64,
}

impl FlightListing {
    /// Seats still open for booking. Never negative.
    pub fn seats_left(&self) -> i64 {
        (i64::from(self.max_capacity) - self.booked).max(0)
    }
}

/// Capacity of a flight against its confirmed reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct FlightLoad {
    pub flight_id: i32,
    pub max_capacity: i32,
    pub booked: i64,
}

/// The airline with the most confirmed reservations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct AirlinePopularity {
    pub airline_name: String,
    pub bookings: i64,
}
