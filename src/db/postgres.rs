//! Provides PostgreSQL database interaction functionalities using `sqlx`.
//!
//! Includes capabilities for establishing connection pools, initializing the database schema,
//! and the flight/passenger/reservation reads and writes behind `ReservationStore`.
//! Also contains integration tests for database operations (requires the `integration-tests` feature).

use super::ReservationStore;
use crate::error::{AppError, Result};
use crate::models::{
    AirlinePopularity, BookingStatus, Flight, FlightListing, FlightLoad, NewFlight, NewPassenger,
    Passenger, Reservation, ReservationChange, ReservationDetails,
};
use crate::rules;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres};
use tracing::{debug, error, info, warn};

/// Represents the database connection pool and provides methods for database operations.
///
/// Holds a `sqlx::Pool` for efficient connection management.
pub struct Database {
    pool: Pool<Postgres>,
}

/// Schema statements, executed in order. Every statement is idempotent.
const SCHEMA: [(&str, &str); 6] = [
    (
        "booking_status type",
        r#"
        DO $$ BEGIN
            CREATE TYPE booking_status AS ENUM ('confirmed', 'cancelled');
        EXCEPTION
            WHEN duplicate_object THEN NULL;
        END $$
        "#,
    ),
    (
        "flights table",
        r#"
        CREATE TABLE IF NOT EXISTS flights (
            flight_id SERIAL PRIMARY KEY,
            airline_name TEXT NOT NULL,
            flight_number TEXT NOT NULL,
            departure_airport TEXT NOT NULL,
            arrival_airport TEXT NOT NULL,
            departure_datetime TIMESTAMP NOT NULL,
            arrival_datetime TIMESTAMP NOT NULL,
            max_capacity INTEGER NOT NULL CHECK (max_capacity > 0),
            CHECK (arrival_datetime >= departure_datetime)
        )
        "#,
    ),
    (
        "passengers table",
        r#"
        CREATE TABLE IF NOT EXISTS passengers (
            passenger_id SERIAL PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone_number TEXT NOT NULL
        )
        "#,
    ),
    (
        "reservations table",
        r#"
        CREATE TABLE IF NOT EXISTS reservations (
            reservation_id SERIAL PRIMARY KEY,
            passenger_id INTEGER NOT NULL REFERENCES passengers(passenger_id) ON DELETE CASCADE,
            flight_id INTEGER NOT NULL REFERENCES flights(flight_id) ON DELETE CASCADE,
            seat_number TEXT NOT NULL,
            booking_status booking_status NOT NULL DEFAULT 'confirmed',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ),
    (
        "active seat index",
        // A seat may be reused once the previous holder cancels.
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS ux_reservations_active_seat
            ON reservations(flight_id, seat_number)
            WHERE booking_status = 'confirmed'
        "#,
    ),
    (
        "flight departure index",
        r#"CREATE INDEX IF NOT EXISTS idx_flights_departure ON flights(departure_datetime)"#,
    ),
];

const RESERVATION_COLUMNS: &str =
    "reservation_id, passenger_id, flight_id, seat_number, booking_status";

impl Database {
    /// Creates a new `Database` instance by establishing a connection pool.
    ///
    /// # Arguments
    ///
    /// * `database_url` - The connection string for the PostgreSQL database.
    /// * `max_connections` - Upper bound on pooled connections.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the connection pool cannot be established.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| {
                error!("Failed to connect to database: {}", e);
                AppError::from(e)
            })?;

        info!("Connected to database successfully");
        Ok(Self { pool })
    }

    #[cfg(all(test, feature = "integration-tests"))]
    fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Checks if the `reservations` table exists in the database schema.
    ///
    /// Used at start-up to decide whether the schema needs to be created.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if the query to `information_schema.tables` fails.
    pub async fn is_schema_initialized(&self) -> Result<bool> {
        debug!("Checking if database schema is initialized...");
        let initialized = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT FROM information_schema.tables WHERE table_schema = 'public' AND table_name = 'reservations')",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to check schema existence: {}", e);
            AppError::from(e)
        })?;
        debug!("Schema initialized status: {}", initialized);
        Ok(initialized)
    }
}

/// Locks the flight row and returns its load. Must run inside a transaction.
async fn lock_flight_load(conn: &mut PgConnection, flight_id: i32) -> Result<FlightLoad> {
    let max_capacity =
        sqlx::query_scalar::<_, i32>("SELECT max_capacity FROM flights WHERE flight_id = $1 FOR UPDATE")
            .bind(flight_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Flight",
                id: flight_id,
            })?;

    let booked = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reservations WHERE flight_id = $1 AND booking_status = 'confirmed'",
    )
    .bind(flight_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(FlightLoad {
        flight_id,
        max_capacity,
        booked,
    })
}

async fn seat_taken(
    conn: &mut PgConnection,
    flight_id: i32,
    seat_number: &str,
    excluding: Option<i32>,
) -> Result<bool> {
    let taken = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM reservations
            WHERE flight_id = $1
              AND seat_number = $2
              AND booking_status = 'confirmed'
              AND ($3::INTEGER IS NULL OR reservation_id <> $3)
        )
        "#,
    )
    .bind(flight_id)
    .bind(seat_number)
    .bind(excluding)
    .fetch_one(conn)
    .await?;
    Ok(taken)
}

/// Turns a unique-index violation on the seat index into `SeatTaken`.
fn map_seat_conflict(err: sqlx::Error, flight_id: i32, seat_number: &str) -> AppError {
    let err = AppError::from(err);
    if err.is_unique_violation() {
        warn!(
            "Seat {} on flight {} was taken concurrently",
            seat_number, flight_id
        );
        return AppError::SeatTaken {
            flight_id,
            seat_number: seat_number.to_string(),
        };
    }
    err
}

impl ReservationStore for Database {
    /// Initializes the database schema: the status enum, the three tables, and indexes.
    ///
    /// Uses `IF NOT EXISTS` (and a guarded `DO` block for the enum) to be idempotent.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Db` if any SQL statement fails during schema creation.
    async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema (if necessary)...");

        for (name, statement) in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    error!("Failed to create {}: {}", name, e);
                    AppError::from(e)
                })?;
            debug!("Ensured {}", name);
        }

        info!("Database schema initialized successfully");
        Ok(())
    }

    async fn insert_flight(&self, flight: &NewFlight) -> Result<Flight> {
        info!(
            "Adding flight {} ({} -> {})",
            flight.flight_number, flight.departure_airport, flight.arrival_airport
        );

        let inserted = sqlx::query_as::<_, Flight>(
            r#"
            INSERT INTO flights
            (airline_name, flight_number, departure_airport, arrival_airport,
             departure_datetime, arrival_datetime, max_capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&flight.airline_name)
        .bind(&flight.flight_number)
        .bind(&flight.departure_airport)
        .bind(&flight.arrival_airport)
        .bind(flight.departure_datetime)
        .bind(flight.arrival_datetime)
        .bind(flight.max_capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert flight: {}", e);
            AppError::from(e)
        })?;

        info!("Flight added with ID {}", inserted.flight_id);
        Ok(inserted)
    }

    async fn delete_flight(&self, flight_id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM flights WHERE flight_id = $1")
            .bind(flight_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete flight {}: {}", flight_id, e);
                AppError::from(e)
            })?;

        let removed = result.rows_affected() > 0;
        info!("Delete flight {}: removed={}", flight_id, removed);
        Ok(removed)
    }

    async fn list_flights(&self) -> Result<Vec<FlightListing>> {
        // LEFT JOIN keeps flights with no bookings; FILTER counts only confirmed ones.
        let flights = sqlx::query_as::<_, FlightListing>(
            r#"
            SELECT
                f.flight_id, f.airline_name, f.flight_number,
                f.departure_airport, f.arrival_airport,
                f.departure_datetime, f.arrival_datetime, f.max_capacity,
                COUNT(r.reservation_id) FILTER (WHERE r.booking_status = 'confirmed') AS booked
            FROM flights f
            LEFT JOIN reservations r ON r.flight_id = f.flight_id
            GROUP BY f.flight_id
            ORDER BY f.departure_datetime, f.flight_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list flights: {}", e);
            AppError::from(e)
        })?;

        debug!("Listed {} flights", flights.len());
        Ok(flights)
    }

    async fn find_flight(&self, flight_id: i32) -> Result<Option<Flight>> {
        let flight = sqlx::query_as::<_, Flight>("SELECT * FROM flights WHERE flight_id = $1")
            .bind(flight_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(flight)
    }

    async fn flight_load(&self, flight_id: i32) -> Result<Option<FlightLoad>> {
        let load = sqlx::query_as::<_, FlightLoad>(
            r#"
            SELECT
                f.flight_id,
                f.max_capacity,
                (SELECT COUNT(*) FROM reservations r
                  WHERE r.flight_id = f.flight_id AND r.booking_status = 'confirmed') AS booked
            FROM flights f
            WHERE f.flight_id = $1
            "#,
        )
        .bind(flight_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(load)
    }

    async fn upsert_passenger(&self, passenger: &NewPassenger) -> Result<(Passenger, bool)> {
        // ON CONFLICT DO NOTHING returns no row for an existing email, so fall back to a lookup.
        let inserted = sqlx::query_as::<_, Passenger>(
            r#"
            INSERT INTO passengers (first_name, last_name, email, phone_number)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(&passenger.first_name)
        .bind(&passenger.last_name)
        .bind(&passenger.email)
        .bind(&passenger.phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to insert passenger: {}", e);
            AppError::from(e)
        })?;

        if let Some(created) = inserted {
            info!("Passenger added with ID {}", created.passenger_id);
            return Ok((created, true));
        }

        let existing =
            sqlx::query_as::<_, Passenger>("SELECT * FROM passengers WHERE email = $1")
                .bind(&passenger.email)
                .fetch_one(&self.pool)
                .await?;
        info!(
            "Passenger with email {} already exists (ID {})",
            existing.email, existing.passenger_id
        );
        Ok((existing, false))
    }

    async fn list_reservations(&self) -> Result<Vec<ReservationDetails>> {
        let reservations = sqlx::query_as::<_, ReservationDetails>(
            r#"
            SELECT
                r.reservation_id, p.first_name, p.last_name,
                r.flight_id, f.airline_name, f.flight_number,
                r.seat_number, r.booking_status
            FROM reservations r
            JOIN passengers p ON r.passenger_id = p.passenger_id
            JOIN flights f ON r.flight_id = f.flight_id
            ORDER BY r.reservation_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list reservations: {}", e);
            AppError::from(e)
        })?;

        debug!("Listed {} reservations", reservations.len());
        Ok(reservations)
    }

    async fn find_reservation(&self, reservation_id: i32) -> Result<Option<Reservation>> {
        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE reservation_id = $1",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reservation)
    }

    async fn is_seat_available(
        &self,
        flight_id: i32,
        seat_number: &str,
        excluding: Option<i32>,
    ) -> Result<bool> {
        let mut conn = self.pool.acquire().await?;
        let taken = seat_taken(&mut conn, flight_id, seat_number, excluding).await?;
        Ok(!taken)
    }

    /// Books a seat on a flight.
    ///
    /// The flight row is locked for the duration of the transaction so the capacity
    /// count cannot change between the check and the insert.
    ///
    /// # Errors
    ///
    /// `NotFound` if the flight or passenger does not exist, `FlightFull` if it has no seats left,
    /// `SeatTaken` if the seat already has a confirmed reservation.
    async fn create_reservation(
        &self,
        passenger_id: i32,
        flight_id: i32,
        seat_number: &str,
    ) -> Result<Reservation> {
        info!(
            "Reserving seat {} on flight {} for passenger {}",
            seat_number, flight_id, passenger_id
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to begin database transaction: {}", e);
            AppError::from(e)
        })?;

        let load = lock_flight_load(&mut tx, flight_id).await?;
        if !rules::has_capacity(load.booked, load.max_capacity) {
            info!("Flight {} is fully booked", flight_id);
            return Err(AppError::FlightFull {
                flight_id,
                max_capacity: load.max_capacity,
            });
        }

        if seat_taken(&mut tx, flight_id, seat_number, None).await? {
            return Err(AppError::SeatTaken {
                flight_id,
                seat_number: seat_number.to_string(),
            });
        }

        let reservation = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            INSERT INTO reservations (passenger_id, flight_id, seat_number, booking_status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(passenger_id)
        .bind(flight_id)
        .bind(seat_number)
        .bind(BookingStatus::Confirmed)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            let err = map_seat_conflict(e, flight_id, seat_number);
            if err.is_foreign_key_violation() {
                return AppError::NotFound {
                    entity: "Passenger",
                    id: passenger_id,
                };
            }
            err
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit database transaction: {}", e);
            AppError::from(e)
        })?;

        info!("Reservation {} confirmed", reservation.reservation_id);
        Ok(reservation)
    }

    /// Moves a reservation to another flight and/or seat.
    ///
    /// Capacity is only re-checked when the flight changes: the reservation already
    /// occupies a place on its current flight.
    async fn update_reservation(
        &self,
        reservation_id: i32,
        change: &ReservationChange,
    ) -> Result<Reservation> {
        info!("Updating reservation {}: {:?}", reservation_id, change);

        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Reservation>(&format!(
            "SELECT {} FROM reservations WHERE reservation_id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
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
            let load = lock_flight_load(&mut tx, flight_id).await?;
            if !rules::has_capacity(load.booked, load.max_capacity) {
                return Err(AppError::FlightFull {
                    flight_id,
                    max_capacity: load.max_capacity,
                });
            }
        }

        if seat_taken(&mut tx, flight_id, &seat_number, Some(reservation_id)).await? {
            return Err(AppError::SeatTaken {
                flight_id,
                seat_number,
            });
        }

        let updated = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            UPDATE reservations
            SET flight_id = $2, seat_number = $3
            WHERE reservation_id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .bind(flight_id)
        .bind(&seat_number)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_seat_conflict(e, flight_id, &seat_number))?;

        tx.commit().await?;

        info!("Reservation {} updated", reservation_id);
        Ok(updated)
    }

    async fn cancel_reservation(&self, reservation_id: i32) -> Result<Reservation> {
        let cancelled = sqlx::query_as::<_, Reservation>(&format!(
            r#"
            UPDATE reservations
            SET booking_status = $2
            WHERE reservation_id = $1
            RETURNING {}
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(reservation_id)
        .bind(BookingStatus::Cancelled)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to cancel reservation {}: {}", reservation_id, e);
            AppError::from(e)
        })?
        .ok_or(AppError::NotFound {
            entity: "Reservation",
            id: reservation_id,
        })?;

        info!("Reservation {} cancelled", reservation_id);
        Ok(cancelled)
    }

    async fn delete_reservation(&self, reservation_id: i32) -> Result<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE reservation_id = $1")
            .bind(reservation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete reservation {}: {}", reservation_id, e);
                AppError::from(e)
            })?;

        let removed = result.rows_affected() > 0;
        info!("Delete reservation {}: removed={}", reservation_id, removed);
        Ok(removed)
    }

    async fn most_popular_airline(&self) -> Result<Option<AirlinePopularity>> {
        let popular = sqlx::query_as::<_, AirlinePopularity>(
            r#"
            SELECT f.airline_name, COUNT(*) AS bookings
            FROM reservations r
            JOIN flights f ON r.flight_id = f.flight_id
            WHERE r.booking_status = 'confirmed'
            GROUP BY f.airline_name
            ORDER BY bookings DESC, f.airline_name ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to query most popular airline: {}", e);
            AppError::from(e)
        })?;

        debug!("Most popular airline: {:?}", popular);
        Ok(popular)
    }
}
