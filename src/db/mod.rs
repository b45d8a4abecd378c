//! Provides database interaction functionalities.
//!
//! `ReservationStore` is the seam the CLI talks to. `Database` implements it on
//! PostgreSQL; tests use an in-memory implementation with the same semantics.

#[cfg(test)]
mod memory;
mod postgres;

#[cfg(test)]
pub use memory::MemoryStore;
pub use postgres::*;

use crate::error::Result;
use crate::models::{
    AirlinePopularity, Flight, FlightListing, FlightLoad, NewFlight, NewPassenger, Passenger,
    Reservation, ReservationChange, ReservationDetails,
};

/// Persistence operations for flights, passengers and reservations.
///
/// Capacity and seat invariants are enforced by the implementation: callers may
/// pre-check for friendlier messages, but `create_reservation` and
/// `update_reservation` re-validate atomically.
#[allow(async_fn_in_trait)]
pub trait ReservationStore {
    /// Creates tables, constraints and indexes if they do not exist.
    async fn init_schema(&self) -> Result<()>;

    async fn insert_flight(&self, flight: &NewFlight) -> Result<Flight>;

    /// Deletes a flight and, by cascade, its reservations. Returns false if absent.
    async fn delete_flight(&self, flight_id: i32) -> Result<bool>;

    /// All flights ordered by departure, with confirmed booking counts.
    async fn list_flights(&self) -> Result<Vec<FlightListing>>;

    async fn find_flight(&self, flight_id: i32) -> Result<Option<Flight>>;

    async fn flight_load(&self, flight_id: i32) -> Result<Option<FlightLoad>>;

    /// Inserts the passenger, or returns the existing one with the same email.
    /// The flag is true when a new row was created.
    async fn upsert_passenger(&self, passenger: &NewPassenger) -> Result<(Passenger, bool)>;

    /// Reservations joined with passenger and flight, ordered by id.
    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>>;

    async fn find_reservation(&self, reservation_id: i32) -> Result<Option<Reservation>>;

    /// True when no confirmed reservation other than `excluding` holds the seat.
    async fn is_seat_available(
        &self,
        flight_id: i32,
        seat_number: &str,
        excluding: Option<i32>,
    ) -> Result<bool>;

    async fn create_reservation(
        &self,
        passenger_id: i32,
        flight_id: i32,
        seat_number: &str,
    ) -> Result<Reservation>;

    async fn update_reservation(
        &self,
        reservation_id: i32,
        change: &ReservationChange,
    ) -> Result<Reservation>;

    /// Marks a reservation cancelled, releasing its seat.
    async fn cancel_reservation(&self, reservation_id: i32) -> Result<Reservation>;

    /// Returns false if the reservation did not exist.
    async fn delete_reservation(&self, reservation_id: i32) -> Result<bool>;

    async fn most_popular_airline(&self) -> Result<Option<AirlinePopularity>>;
}
