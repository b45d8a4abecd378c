use crate::cli::{interactive, render};
use crate::db::ReservationStore;
use crate::error::{AppError, Result};
use crate::models::{
    AirlinePopularity, BookingStatus, Flight, FlightListing, FlightLoad, Passenger, Reservation,
    ReservationChange, ReservationDetails,
};
use crate::rules::{self, FlightDraft};
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing::{info, warn};

/// CLI tool for managing airline flights, passengers and seat reservations.
///
/// Runs the interactive menu when no subcommand is given.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// PostgreSQL connection string (overrides DATABASE_URL)
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Initialize the database schema
    InitDb,

    /// List flights ordered by departure time
    Flights {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// List current reservations
    Reservations {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Add a new flight
    AddFlight(AddFlightArgs),

    /// Remove a flight together with its reservations
    RemoveFlight {
        #[arg(long)]
        flight_id: i32,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Register a passenger (an existing email is reused)
    AddPassenger(PassengerArgs),

    /// Book a seat for a passenger
    Book(BookArgs),

    /// Move a reservation to another flight and/or seat
    EditReservation(EditReservationArgs),

    /// Mark a reservation as cancelled, releasing its seat
    CancelReservation {
        #[arg(long)]
        reservation_id: i32,
    },

    /// Delete a reservation
    DeleteReservation {
        #[arg(long)]
        reservation_id: i32,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show the airline with the most confirmed reservations
    PopularAirline,
}

#[derive(Args, Debug, Clone)]
pub struct AddFlightArgs {
    #[arg(long)]
    pub airline: String,

    #[arg(long)]
    pub flight_number: String,

    /// Departure airport
    #[arg(long = "from")]
    pub departure_airport: String,

    /// Arrival airport
    #[arg(long = "to")]
    pub arrival_airport: String,

    /// Departure time (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub departure: String,

    /// Arrival time (YYYY-MM-DD HH:MM:SS)
    #[arg(long)]
    pub arrival: String,

    /// Maximum number of confirmed reservations
    #[arg(long)]
    pub capacity: i32,
}

#[derive(Args, Debug, Clone)]
pub struct PassengerArgs {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long)]
    pub email: String,

    #[arg(long)]
    pub phone: String,
}

#[derive(Args, Debug, Clone)]
pub struct BookArgs {
    #[command(flatten)]
    pub passenger: PassengerArgs,

    #[arg(long)]
    pub flight_id: i32,

    /// Seat label, e.g. 12A
    #[arg(long)]
    pub seat: String,
}

#[derive(Args, Debug, Clone)]
pub struct EditReservationArgs {
    #[arg(long)]
    pub reservation_id: i32,

    /// New flight ID (keeps the current flight when omitted)
    #[arg(long)]
    pub flight_id: Option<i32>,

    /// New seat (keeps the current seat when omitted)
    #[arg(long)]
    pub seat: Option<String>,
}

/// Result of a successful booking.
#[derive(Debug, Clone)]
pub struct Booking {
    pub passenger: Passenger,
    /// False when an existing passenger with the same email was reused.
    pub new_passenger: bool,
    pub reservation: Reservation,
}

/// Confirmation text for removing a flight. The cascade also drops cancelled reservations.
fn removal_prompt(load: &FlightLoad) -> String {
    format!(
        "Are you sure you want to remove Flight ID {}? All of its reservations ({} confirmed) will be deleted with it.",
        load.flight_id, load.booked
    )
}

/// Only confirmed reservations can be moved to another flight or seat.
pub fn ensure_editable(reservation: &Reservation) -> Result<()> {
    if reservation.booking_status != BookingStatus::Confirmed {
        return Err(AppError::validation(format!(
            "Reservation {} is {} and cannot be edited.",
            reservation.reservation_id, reservation.booking_status
        )));
    }
    Ok(())
}

/// CLI application
pub struct App<S> {
    store: S,
}

impl<S: ReservationStore> App<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs one command and prints its outcome.
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::InitDb => {
                self.store.init_schema().await?;
                println!("{}", "Database schema initialized.".green());
            },
            Commands::Flights { json } => {
                let flights = self.flights().await?;
                if json {
                    render::print_json(&flights)?;
                } else if flights.is_empty() {
                    println!("{}", "No available flights.".yellow());
                } else {
                    println!("{}", render::flights_table(&flights));
                }
            },
            Commands::Reservations { json } => {
                let reservations = self.reservations().await?;
                if json {
                    render::print_json(&reservations)?;
                } else if reservations.is_empty() {
                    println!("{}", "No current reservations found.".yellow());
                } else {
                    println!("{}", render::reservations_table(&reservations));
                }
            },
            Commands::AddFlight(args) => {
                let flight = self.add_flight(&args).await?;
                println!(
                    "{} Flight ID: {}",
                    "Flight added successfully.".green(),
                    flight.flight_id
                );
            },
            Commands::RemoveFlight { flight_id, yes } => {
                let load = self
                    .store
                    .flight_load(flight_id)
                    .await?
                    .ok_or(AppError::NotFound {
                        entity: "Flight",
                        id: flight_id,
                    })?;
                if !yes && !interactive::confirm(&removal_prompt(&load))? {
                    println!("{}", "Flight removal cancelled.".yellow());
                    return Ok(());
                }
                self.remove_flight(flight_id).await?;
                println!("{}", "Flight removed successfully.".green());
            },
            Commands::AddPassenger(args) => {
                let (passenger, created) = self.add_passenger(&args).await?;
                if created {
                    println!(
                        "{} Passenger ID: {}",
                        "Passenger added successfully.".green(),
                        passenger.passenger_id
                    );
                } else {
                    println!(
                        "{}",
                        format!(
                            "Passenger with email {} already exists. Passenger ID: {}",
                            passenger.email, passenger.passenger_id
                        )
                        .yellow()
                    );
                }
            },
            Commands::Book(args) => {
                let booking = self.book(&args).await?;
                if !booking.new_passenger {
                    println!(
                        "Using existing passenger ID {} ({}).",
                        booking.passenger.passenger_id, booking.passenger.email
                    );
                }
                println!(
                    "{} Reservation ID: {}, Flight ID: {}, Seat: {}",
                    "Reservation made successfully!".green(),
                    booking.reservation.reservation_id,
                    booking.reservation.flight_id,
                    booking.reservation.seat_number
                );
            },
            Commands::EditReservation(args) => {
                let updated = self.edit_reservation(&args).await?;
                println!(
                    "{} Flight ID: {}, Seat: {}",
                    "Reservation updated successfully.".green(),
                    updated.flight_id,
                    updated.seat_number
                );
            },
            Commands::CancelReservation { reservation_id } => {
                self.cancel_reservation(reservation_id).await?;
                println!("{}", "Reservation cancelled.".green());
            },
            Commands::DeleteReservation {
                reservation_id,
                yes,
            } => {
                if self.store.find_reservation(reservation_id).await?.is_none() {
                    return Err(AppError::NotFound {
                        entity: "Reservation",
                        id: reservation_id,
                    });
                }
                let prompt = format!(
                    "Are you sure you want to delete reservation ID {}?",
                    reservation_id
                );
                if !yes && !interactive::confirm(&prompt)? {
                    println!("{}", "Deletion cancelled.".yellow());
                    return Ok(());
                }
                self.delete_reservation(reservation_id).await?;
                println!("{}", "Reservation deleted successfully.".green());
            },
            Commands::PopularAirline => match self.popular_airline().await? {
                Some(popular) => println!(
                    "Most popular airline: {} ({} confirmed reservations)",
                    popular.airline_name.bold(),
                    popular.bookings
                ),
                None => println!("{}", "No recommendation available.".yellow()),
            },
        }

        Ok(())
    }

    pub async fn flights(&self) -> Result<Vec<FlightListing>> {
        self.store.list_flights().await
    }

    pub async fn reservations(&self) -> Result<Vec<ReservationDetails>> {
        self.store.list_reservations().await
    }

    pub async fn popular_airline(&self) -> Result<Option<AirlinePopularity>> {
        self.store.most_popular_airline().await
    }

    /// Validates and stores a new flight.
    pub async fn add_flight(&self, args: &AddFlightArgs) -> Result<Flight> {
        let flight = rules::validate_new_flight(&FlightDraft {
            airline_name: &args.airline,
            flight_number: &args.flight_number,
            departure_airport: &args.departure_airport,
            arrival_airport: &args.arrival_airport,
            departure_datetime: &args.departure,
            arrival_datetime: &args.arrival,
            max_capacity: args.capacity,
        })?;
        self.store.insert_flight(&flight).await
    }

    pub async fn remove_flight(&self, flight_id: i32) -> Result<()> {
        if !self.store.delete_flight(flight_id).await? {
            return Err(AppError::NotFound {
                entity: "Flight",
                id: flight_id,
            });
        }
        info!("Flight {} removed", flight_id);
        Ok(())
    }

    pub async fn add_passenger(&self, args: &PassengerArgs) -> Result<(Passenger, bool)> {
        let passenger =
            rules::validate_new_passenger(&args.first_name, &args.last_name, &args.email, &args.phone)?;
        self.store.upsert_passenger(&passenger).await
    }

    /// Books a seat, registering the passenger if needed.
    ///
    /// Flight, capacity and seat are checked before the passenger is written so a
    /// rejected booking leaves no orphan passenger behind. The store re-checks
    /// capacity and seat atomically when inserting.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed input, `NotFound` for an unknown flight,
    /// `FlightFull` or `SeatTaken` when the booking cannot be honoured.
    pub async fn book(&self, args: &BookArgs) -> Result<Booking> {
        let details = rules::validate_new_passenger(
            &args.passenger.first_name,
            &args.passenger.last_name,
            &args.passenger.email,
            &args.passenger.phone,
        )?;
        let seat_number = rules::normalize_seat(&args.seat)?;

        let load = self
            .store
            .flight_load(args.flight_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Flight",
                id: args.flight_id,
            })?;
        if !rules::has_capacity(load.booked, load.max_capacity) {
            return Err(AppError::FlightFull {
                flight_id: args.flight_id,
                max_capacity: load.max_capacity,
            });
        }
        if !self
            .store
            .is_seat_available(args.flight_id, &seat_number, None)
            .await?
        {
            return Err(AppError::SeatTaken {
                flight_id: args.flight_id,
                seat_number,
            });
        }

        let (passenger, new_passenger) = self.store.upsert_passenger(&details).await?;
        let reservation = self
            .store
            .create_reservation(passenger.passenger_id, args.flight_id, &seat_number)
            .await?;

        info!(
            "Booked reservation {} for passenger {}",
            reservation.reservation_id, passenger.passenger_id
        );
        Ok(Booking {
            passenger,
            new_passenger,
            reservation,
        })
    }

    pub async fn edit_reservation(&self, args: &EditReservationArgs) -> Result<Reservation> {
        let change = ReservationChange {
            flight_id: args.flight_id,
            seat_number: args
                .seat
                .as_deref()
                .map(rules::normalize_seat)
                .transpose()?,
        };
        if change.is_empty() {
            return Err(AppError::validation(
                "Nothing to change: give a new flight ID and/or seat number.",
            ));
        }

        let current = self
            .store
            .find_reservation(args.reservation_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Reservation",
                id: args.reservation_id,
            })?;
        ensure_editable(&current)?;
        if let Some(flight_id) = change.flight_id {
            if self.store.find_flight(flight_id).await?.is_none() {
                return Err(AppError::NotFound {
                    entity: "Flight",
                    id: flight_id,
                });
            }
        }

        self.store
            .update_reservation(args.reservation_id, &change)
            .await
    }

    pub async fn cancel_reservation(&self, reservation_id: i32) -> Result<Reservation> {
        let reservation = self
            .store
            .find_reservation(reservation_id)
            .await?
            .ok_or(AppError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            })?;
        if reservation.booking_status != BookingStatus::Confirmed {
            warn!("Reservation {} is already cancelled", reservation_id);
            return Err(AppError::validation(format!(
                "Reservation {} is already cancelled.",
                reservation_id
            )));
        }
        self.store.cancel_reservation(reservation_id).await
    }

    pub async fn delete_reservation(&self, reservation_id: i32) -> Result<()> {
        if !self.store.delete_reservation(reservation_id).await? {
            return Err(AppError::NotFound {
                entity: "Reservation",
                id: reservation_id,
            });
        }
        info!("Reservation {} deleted", reservation_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn app() -> App<MemoryStore> {
        App::new(MemoryStore::new())
    }

    fn flight_args(airline: &str, number: &str, capacity: i32) -> AddFlightArgs {
        AddFlightArgs {
            airline: airline.to_string(),
            flight_number: number.to_string(),
            departure_airport: "AMS".to_string(),
            arrival_airport: "CDG".to_string(),
            departure: "2024-07-01 07:00:00".to_string(),
            arrival: "2024-07-01 08:20:00".to_string(),
            capacity,
        }
    }

    fn passenger(n: usize) -> PassengerArgs {
        PassengerArgs {
            first_name: format!("First{}", n),
            last_name: "Traveller".to_string(),
            email: format!("traveller{}@example.com", n),
            phone: "555-0100".to_string(),
        }
    }

    fn book_args(n: usize, flight_id: i32, seat: &str) -> BookArgs {
        BookArgs {
            passenger: passenger(n),
            flight_id,
            seat: seat.to_string(),
        }
    }

    #[tokio::test]
    async fn test_init_db() {
        let app = app();
        app.run_command(Commands::InitDb).await.unwrap();
        assert!(app.store().schema_ready());
    }

    #[tokio::test]
    async fn test_booking_beyond_capacity_is_rejected() {
        let app = app();
        let capacity = 3;
        let flight = app
            .add_flight(&flight_args("KLM", "KL1227", capacity))
            .await
            .unwrap();

        for n in 0..capacity as usize {
            let seat = format!("{}A", n + 1);
            app.book(&book_args(n, flight.flight_id, &seat))
                .await
                .unwrap();
        }

        let overflow = app.book(&book_args(99, flight.flight_id, "20F")).await;
        match overflow {
            Err(AppError::FlightFull {
                flight_id,
                max_capacity,
            }) => {
                assert_eq!(flight_id, flight.flight_id);
                assert_eq!(max_capacity, capacity);
            },
            other => panic!("Expected FlightFull, got {:?}", other),
        }

        // The rejected passenger must not have been registered.
        let reservations = app.reservations().await.unwrap();
        assert_eq!(reservations.len(), capacity as usize);
        let listing = app.flights().await.unwrap();
        assert_eq!(listing[0].seats_left(), 0);
    }

    #[tokio::test]
    async fn test_seat_is_unique_per_flight() {
        let app = app();
        let first = app.add_flight(&flight_args("KLM", "KL1", 5)).await.unwrap();
        let second = app.add_flight(&flight_args("KLM", "KL2", 5)).await.unwrap();

        app.book(&book_args(1, first.flight_id, "12a")).await.unwrap();
        let clash = app.book(&book_args(2, first.flight_id, "12A")).await;
        assert!(matches!(clash, Err(AppError::SeatTaken { .. })));

        // Same seat on a different flight is fine.
        app.book(&book_args(2, second.flight_id, "12A"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancel_releases_seat_and_capacity() {
        let app = app();
        let flight = app.add_flight(&flight_args("KLM", "KL9", 1)).await.unwrap();
        let booking = app
            .book(&book_args(1, flight.flight_id, "1A"))
            .await
            .unwrap();

        let cancelled = app
            .cancel_reservation(booking.reservation.reservation_id)
            .await
            .unwrap();
        assert_eq!(cancelled.booking_status, BookingStatus::Cancelled);

        assert!(matches!(
            app.cancel_reservation(booking.reservation.reservation_id)
                .await,
            Err(AppError::Validation(_))
        ));

        app.book(&book_args(2, flight.flight_id, "1A"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_booking_unknown_flight() {
        let app = app();
        let result = app.book(&book_args(1, 404, "1A")).await;
        assert!(matches!(
            result,
            Err(AppError::NotFound {
                entity: "Flight",
                id: 404
            })
        ));
    }

    #[tokio::test]
    async fn test_add_flight_rejects_arrival_before_departure() {
        let app = app();
        let mut args = flight_args("KLM", "KL5", 10);
        args.arrival = "2024-07-01 06:00:00".to_string();

        let result = app.add_flight(&args).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(app.flights().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_flight_rejects_non_positive_capacity() {
        let app = app();
        let result = app.add_flight(&flight_args("KLM", "KL6", 0)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_passenger_email_is_deduplicated() {
        let app = app();
        let (first, created) = app.add_passenger(&passenger(1)).await.unwrap();
        assert!(created);

        let mut again = passenger(1);
        again.email = again.email.to_uppercase();
        let (second, created) = app.add_passenger(&again).await.unwrap();
        assert!(!created);
        assert_eq!(first.passenger_id, second.passenger_id);
    }

    #[tokio::test]
    async fn test_edit_reservation() {
        let app = app();
        let roomy = app.add_flight(&flight_args("KLM", "KL10", 5)).await.unwrap();
        let full = app.add_flight(&flight_args("BA", "BA10", 1)).await.unwrap();

        app.book(&book_args(1, full.flight_id, "1A")).await.unwrap();
        let booking = app
            .book(&book_args(2, roomy.flight_id, "2B"))
            .await
            .unwrap();
        let id = booking.reservation.reservation_id;

        let to_full = EditReservationArgs {
            reservation_id: id,
            flight_id: Some(full.flight_id),
            seat: Some("1B".to_string()),
        };
        assert!(matches!(
            app.edit_reservation(&to_full).await,
            Err(AppError::FlightFull { .. })
        ));

        let nothing = EditReservationArgs {
            reservation_id: id,
            flight_id: None,
            seat: None,
        };
        assert!(matches!(
            app.edit_reservation(&nothing).await,
            Err(AppError::Validation(_))
        ));

        let seat_only = EditReservationArgs {
            reservation_id: id,
            flight_id: None,
            seat: Some("3c".to_string()),
        };
        let updated = app.edit_reservation(&seat_only).await.unwrap();
        assert_eq!(updated.seat_number, "3C");
        assert_eq!(updated.flight_id, roomy.flight_id);
    }

    #[tokio::test]
    async fn test_edit_onto_taken_seat_on_other_flight() {
        let app = app();
        let origin = app.add_flight(&flight_args("KLM", "KL20", 5)).await.unwrap();
        let target = app.add_flight(&flight_args("KLM", "KL21", 5)).await.unwrap();

        app.book(&book_args(1, target.flight_id, "1A")).await.unwrap();
        let moving = app
            .book(&book_args(2, origin.flight_id, "1A"))
            .await
            .unwrap();

        let args = EditReservationArgs {
            reservation_id: moving.reservation.reservation_id,
            flight_id: Some(target.flight_id),
            seat: None,
        };
        match app.edit_reservation(&args).await {
            Err(AppError::SeatTaken {
                flight_id,
                seat_number,
            }) => {
                assert_eq!(flight_id, target.flight_id);
                assert_eq!(seat_number, "1A");
            },
            other => panic!("Expected SeatTaken, got {:?}", other),
        }

        // The reservation keeps its original flight.
        let unchanged = app
            .store()
            .find_reservation(moving.reservation.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(unchanged.flight_id, origin.flight_id);
    }

    #[tokio::test]
    async fn test_cancelled_reservation_cannot_be_edited() {
        let app = app();
        let flight = app.add_flight(&flight_args("KLM", "KL22", 5)).await.unwrap();
        let booking = app
            .book(&book_args(1, flight.flight_id, "1A"))
            .await
            .unwrap();
        let id = booking.reservation.reservation_id;
        app.cancel_reservation(id).await.unwrap();

        let args = EditReservationArgs {
            reservation_id: id,
            flight_id: None,
            seat: Some("2B".to_string()),
        };
        assert!(matches!(
            app.edit_reservation(&args).await,
            Err(AppError::Validation(_))
        ));

        let cancelled = app.store().find_reservation(id).await.unwrap().unwrap();
        assert_eq!(cancelled.seat_number, "1A");
        assert!(matches!(
            ensure_editable(&cancelled),
            Err(AppError::Validation(_))
        ));
        assert!(ensure_editable(&booking.reservation).is_ok());
    }

    #[tokio::test]
    async fn test_reservation_for_unknown_passenger() {
        let app = app();
        let flight = app.add_flight(&flight_args("KLM", "KL23", 5)).await.unwrap();
        let result = app
            .store()
            .create_reservation(404_404, flight.flight_id, "1A")
            .await;
        assert!(matches!(
            result,
            Err(AppError::NotFound {
                entity: "Passenger",
                id: 404_404
            })
        ));
    }

    #[test]
    fn test_removal_prompt_mentions_all_reservations() {
        let prompt = removal_prompt(&FlightLoad {
            flight_id: 8,
            max_capacity: 10,
            booked: 3,
        });
        assert!(prompt.contains("Flight ID 8"));
        assert!(prompt.contains("All of its reservations (3 confirmed)"));
    }

    #[tokio::test]
    async fn test_seat_change_on_full_flight_is_allowed() {
        let app = app();
        let flight = app.add_flight(&flight_args("KLM", "KL11", 1)).await.unwrap();
        let booking = app
            .book(&book_args(1, flight.flight_id, "1A"))
            .await
            .unwrap();

        let args = EditReservationArgs {
            reservation_id: booking.reservation.reservation_id,
            flight_id: Some(flight.flight_id),
            seat: Some("1B".to_string()),
        };
        let updated = app.edit_reservation(&args).await.unwrap();
        assert_eq!(updated.seat_number, "1B");
    }

    #[tokio::test]
    async fn test_edit_unknown_reservation() {
        let app = app();
        let args = EditReservationArgs {
            reservation_id: 77,
            flight_id: None,
            seat: Some("1A".to_string()),
        };
        assert!(matches!(
            app.edit_reservation(&args).await,
            Err(AppError::NotFound {
                entity: "Reservation",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_remove_flight_drops_reservations() {
        let app = app();
        let flight = app.add_flight(&flight_args("KLM", "KL12", 4)).await.unwrap();
        app.book(&book_args(1, flight.flight_id, "1A")).await.unwrap();

        app.run_command(Commands::RemoveFlight {
            flight_id: flight.flight_id,
            yes: true,
        })
        .await
        .unwrap();

        assert!(app.flights().await.unwrap().is_empty());
        assert!(app.reservations().await.unwrap().is_empty());
        assert!(matches!(
            app.remove_flight(flight.flight_id).await,
            Err(AppError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_reservation() {
        let app = app();
        let flight = app.add_flight(&flight_args("KLM", "KL13", 4)).await.unwrap();
        let booking = app
            .book(&book_args(1, flight.flight_id, "1A"))
            .await
            .unwrap();

        app.run_command(Commands::DeleteReservation {
            reservation_id: booking.reservation.reservation_id,
            yes: true,
        })
        .await
        .unwrap();
        assert!(app.reservations().await.unwrap().is_empty());

        let again = app
            .run_command(Commands::DeleteReservation {
                reservation_id: booking.reservation.reservation_id,
                yes: true,
            })
            .await;
        assert!(matches!(again, Err(AppError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_popular_airline_counts_confirmed_only() {
        let app = app();
        assert_eq!(app.popular_airline().await.unwrap(), None);

        let klm = app.add_flight(&flight_args("KLM", "KL14", 5)).await.unwrap();
        let ba = app.add_flight(&flight_args("BA", "BA14", 5)).await.unwrap();

        app.book(&book_args(1, klm.flight_id, "1A")).await.unwrap();
        let dropped = app.book(&book_args(2, klm.flight_id, "1B")).await.unwrap();
        app.cancel_reservation(dropped.reservation.reservation_id)
            .await
            .unwrap();
        app.book(&book_args(3, ba.flight_id, "1A")).await.unwrap();
        app.book(&book_args(4, ba.flight_id, "1B")).await.unwrap();

        let popular = app.popular_airline().await.unwrap().unwrap();
        assert_eq!(popular.airline_name, "BA");
        assert_eq!(popular.bookings, 2);
    }

    #[tokio::test]
    async fn test_popular_airline_ties_break_by_name() {
        let app = app();
        let klm = app.add_flight(&flight_args("KLM", "KL15", 5)).await.unwrap();
        let ba = app.add_flight(&flight_args("BA", "BA15", 5)).await.unwrap();
        app.book(&book_args(1, klm.flight_id, "1A")).await.unwrap();
        app.book(&book_args(2, ba.flight_id, "1A")).await.unwrap();

        let popular = app.popular_airline().await.unwrap().unwrap();
        assert_eq!(popular.airline_name, "BA");
    }

    #[test]
    fn test_parse_book_subcommand() {
        let cli = Cli::try_parse_from([
            "air-reserve",
            "book",
            "--first-name",
            "Ada",
            "--last-name",
            "Lovelace",
            "--email",
            "ada@example.org",
            "--phone",
            "555",
            "--flight-id",
            "3",
            "--seat",
            "12A",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Book(args)) => {
                assert_eq!(args.passenger.first_name, "Ada");
                assert_eq!(args.flight_id, 3);
                assert_eq!(args.seat, "12A");
            },
            other => panic!("Expected Book, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_flight_and_global_url() {
        let cli = Cli::try_parse_from([
            "air-reserve",
            "add-flight",
            "--airline",
            "KLM",
            "--flight-number",
            "KL1",
            "--from",
            "AMS",
            "--to",
            "JFK",
            "--departure",
            "2024-07-01 07:00:00",
            "--arrival",
            "2024-07-01 15:00:00",
            "--capacity",
            "150",
            "--database-url",
            "postgres://localhost/test",
        ])
        .unwrap();

        assert_eq!(cli.database_url.as_deref(), Some("postgres://localhost/test"));
        match cli.command {
            Some(Commands::AddFlight(args)) => {
                assert_eq!(args.departure_airport, "AMS");
                assert_eq!(args.arrival_airport, "JFK");
                assert_eq!(args.capacity, 150);
            },
            other => panic!("Expected AddFlight, got {:?}", other),
        }
    }

    #[test]
    fn test_no_subcommand_means_interactive() {
        let cli = Cli::try_parse_from(["air-reserve"]).unwrap();
        assert!(cli.command.is_none());
    }
}
