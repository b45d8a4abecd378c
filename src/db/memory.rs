//! In-memory `ReservationStore` used by unit tests.
//!
//! Mirrors the PostgreSQL semantics: confirmed-only capacity counting, per-flight seat
//! uniqueness among confirmed reservations, email de-duplication and cascade on flight removal.

use super::ReservationStore;
use crate::error::{AppError, Result};
use crate::models::{
    AirlinePopularity, BookingStatus, Flight, FlightListing, FlightLoad, NewFlight, NewPassenger,
    Passenger, Reservation, ReservationChange, ReservationDetails,
};
use crate::rules;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    schema_ready: bool,
    next_id: i32,
    flights: BTreeMap<i32, Flight>,
    passengers: BTreeMap<i32, Passenger>,
    reservations: BTreeMap<i32, Reservation>,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn booked(&self, flight_id: i32) -> i64 {
        self.reservations
            .values()
            .filter(|r| r.flight_id == flight_id && r.booking_status == BookingStatus::Confirmed)
            .count() as i64
    }

    fn seat_taken(&self, flight_id: i32, seat_number: &str, excluding: Option<i32>) -> bool {
        self.reservations.values().any(|r| {
            r.flight_id == flight_id
                && r.seat_number == seat_number
                && r.booking_status == BookingStatus::Confirmed
                && Some(r.reservation_id) != excluding
        })
    }

    fn load(&self, flight_id: i32) -> Result<FlightLoad> {
        let flight = self.flights.get(&flight_id).ok_or(AppError::NotFound {
            entity: "Flight",
            id: flight_id,
        })?;
        Ok(FlightLoad {
            flight_id,
            max_capacity: flight.max_capacity,
            booked: self.booked(flight_id),
        })
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema_ready(&self) -> bool {
        self.state().schema_ready
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }
}

impl ReservationStore for MemoryStore {
    async fn init_schema(&self) -> Result<()> {
        self.state().schema_ready = true;
        Ok(())
    }

    async fn insert_flight(&self, flight: &NewFlight) -> Result<Flight> {
        let mut state = self.state();
        let flight_id = state.next_id();
        let stored = Flight {
            flight_id,
            airline_name: flight.airline_name.clone(),
            flight_number: flight.flight_number.clone(),
            departure_airport: flight.departure_airport.clone(),
            arrival_airport: flight.arrival_airport.clone(),
            departure_datetime: flight.departure_datetime,
            arrival_datetime: flight.arrival_datetime,
            max_capacity: flight.max_capacity,
        };
        state.flights.insert(flight_id, stored.clone());
        Ok(stored)
    }

    async fn delete_flight(&self, flight_id: i32) -> Result<bool> {
        let mut state = self.state();
        let removed = state.flights.remove(&flight_id).is_some();
        state.reservations.retain(|_, r| r.flight_id != flight_id);
        Ok(removed)
    }

    async fn list_flights(&self) -> Result<Vec<FlightListing>> {
        let state = self.state();
        let mut flights: Vec<FlightListing> = state
            .flights
            .values()
            .map(|f| FlightListing {
                flight_id: f.flight_id,
                airline_name: f.airline_name.clone(),
                flight_number: f.flight_number.clone(),
                departure_airport: f.departure_airport.clone(),
                arrival_airport: f.arrival_airport.clone(),
                departure_datetime: f.departure_datetime,
                arrival_datetime: f.arrival_datetime,
                max_capacity: f.max_capacity,
                booked: state.booked(f.flight_id),
            })
            .collect();
        flights.sort_by_key(|f| (f.departure_datetime, f.flight_id));
        Ok(flights)
    }

    async fn find_flight(&self, flight_id: i32) -> Result<Option<Flight>> {
        Ok(self.state().flights.get(&flight_id).cloned())
    }

    async fn flight_load(&self, flight_id: i32) -> Result<Option<FlightLoad>> {
        let state = self.state();
        if !state.flights.contains_key(&flight_id) {
            return Ok(None);
        }
        state.load(flight_id).map(Some)
    }

    async fn upsert_passenger(&self, passenger: &NewPassenger) -> Result<(Passenger, bool)> {
        let mut state = self.state();
        if let Some(existing) = state
            .passengers
            .values()
            .find(|p| p.email == passenger.email)
        {
            return Ok((existing.clone(), false));
        }
        let passenger_id = state.next_id();
        let created = Passenger {
            passenger_id,
            first_name: passenger.first_name.clone(),
            last_name: passenger.last_name.clone(),
            email: passenger.email.clone(),
            phone_number: passenger.phone_number.clone(),
        };
        state.passengers.insert(passenger_id, created.clone());
        Ok((created, true))
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>> {
        let state = self.state();
        let details = state
            .reservations
            .values()
            .filter_map(|r| {
                let passenger = state.passengers.get(&r.passenger_id)?;
                let flight = state.flights.get(&r.flight_id)?;
                Some(ReservationDetails {
                    reservation_id: r.reservation_id,
                    first_name: passenger.first_name.clone(),
                    last_name: passenger.last_name.clone(),
                    flight_id: r.flight_id,
                    airline_name: flight.airline_name.clone(),
                    flight_number: flight.flight_number.clone(),
                    seat_number: r.seat_number.clone(),
                    booking_status: r.booking_status,
                })
            })
            .collect();
        Ok(details)
    }

    async fn find_reservation(&self, reservation_id: i32) -> Result<Option<Reservation>> {
        Ok(self.state().reservations.get(&reservation_id).cloned())
    }

    async fn is_seat_available(
        &self,
        flight_id: i32,
        seat_number: &str,
        excluding: Option<i32>,
    ) -> Result<bool> {
        Ok(!self.state().seat_taken(flight_id, seat_number, excluding))
    }

    async fn create_reservation(
        &self,
        passenger_id: i32,
        flight_id: i32,
        seat_number: &str,
    ) -> Result<Reservation> {
        let mut state = self.state();
        let load = state.load(flight_id)?;
        if !rules::has_capacity(load.booked, load.max_capacity) {
            return Err(AppError::FlightFull {
                flight_id,
                max_capacity: load.max_capacity,
            });
        }
        if state.seat_taken(flight_id, seat_number, None) {
            return Err(AppError::SeatTaken {
                flight_id,
                seat_number: seat_number.to_string(),
            });
        }
        if !state.passengers.contains_key(&passenger_id) {
            return Err(AppError::NotFound {
                entity: "Passenger",
                id: passenger_id,
            });
        }
        let reservation_id = state.next_id();
        let reservation = Reservation {
            reservation_id,
            passenger_id,
            flight_id,
            seat_number: seat_number.to_string(),
            booking_status: BookingStatus::Confirmed,
        };
        state.reservations.insert(reservation_id, reservation.clone());
        Ok(reservation)
    }

    async fn update_reservation(
        &self,
        reservation_id: i32,
        change: &ReservationChange,
    ) -> Result<Reservation> {
        let mut state = self.state();
        let current = state
            .reservations
            .get(&reservation_id)
            .cloned()
            .ok_or(AppError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            })?;
        if current.booking_status != BookingStatus::Confirmed {
            return Err(AppError::validation(format!(
                "Reservation {} is {} and cannot be edited.",
                reservation_id, current.booking_status
            )));
        }

        let flight_id = change.flight_id.unwrap_or(current.flight_id);
        let seat_number = change
            .seat_number
            .clone()
            .unwrap_or_else(|| current.seat_number.clone());

        if flight_id != current.flight_id {
            let load = state.load(flight_id)?;
            if !rules::has_capacity(load.booked, load.max_capacity) {
                return Err(AppError::FlightFull {
                    flight_id,
                    max_capacity: load.max_capacity,
                });
            }
        }
        if state.seat_taken(flight_id, &seat_number, Some(reservation_id)) {
            return Err(AppError::SeatTaken {
                flight_id,
                seat_number,
            });
        }

        let updated = Reservation {
            flight_id,
            seat_number,
            ..current
        };
        state.reservations.insert(reservation_id, updated.clone());
        Ok(updated)
    }

    async fn cancel_reservation(&self, reservation_id: i32) -> Result<Reservation> {
        let mut state = self.state();
        let reservation = state
            .reservations
            .get_mut(&reservation_id)
            .ok_or(AppError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            })?;
        reservation.booking_status = BookingStatus::Cancelled;
        Ok(reservation.clone())
    }

    async fn delete_reservation(&self, reservation_id: i32) -> Result<bool> {
        Ok(self.state().reservations.remove(&reservation_id).is_some())
    }

    async fn most_popular_airline(&self) -> Result<Option<AirlinePopularity>> {
        let state = self.state();
        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for reservation in state
            .reservations
            .values()
            .filter(|r| r.booking_status == BookingStatus::Confirmed)
        {
            if let Some(flight) = state.flights.get(&reservation.flight_id) {
                *counts.entry(flight.airline_name.as_str()).or_default() += 1;
            }
        }
        // max_by_key keeps the last maximum; reverse name order makes ties go to the first name.
        let popular = counts
            .into_iter()
            .rev()
            .max_by_key(|(_, bookings)| *bookings)
            .map(|(airline_name, bookings)| AirlinePopularity {
                airline_name: airline_name.to_string(),
                bookings,
            });
        Ok(popular)
    }
}
