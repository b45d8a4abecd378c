//! Passengers, reservations and the joined views printed by the CLI.

use serde::Serialize;
use std::fmt;

/// A registered passenger. `email` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Passenger {
    pub passenger_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
}

/// Validated passenger details awaiting insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPassenger {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
}

/// Lifecycle of a reservation. Maps to the Postgres enum `booking_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[sqlx(type_name = "booking_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Holds a seat and counts toward flight capacity.
    Confirmed,
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Confirmed => f.write_str("confirmed"),
            BookingStatus::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A row of the `reservations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Reservation {
    pub reservation_id: i32,
    pub passenger_id: i32,
    pub flight_id: i32,
    pub seat_number: String,
    pub booking_status: BookingStatus,
}

/// Reservation joined with its passenger and flight, used for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ReservationDetails {
    pub reservation_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub flight_id: i32,
    pub airline_name: String,
    pub flight_number: String,
    pub seat_number: String,
    pub booking_status: BookingStatus,
}

impl ReservationDetails {
    pub fn passenger_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Requested changes to an existing reservation. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationChange {
    pub flight_id: Option<i32>,
    pub seat_number: Option<String>,
}

impl ReservationChange {
    pub fn is_empty(&self) -> bool {
        self.flight_id.is_none() && self.seat_number.is_none()
    }
}
