//! Prompt-driven flows behind the interactive menu.
//!
//! Each flow gathers input with `dialoguer`, re-prompting where a value can be checked
//! up front, and then hands a fully-formed `Commands` value to `App::run_command`.
//! An empty answer cancels the flow; `0` at an ID prompt exits it.

use crate::cli::{
    ensure_editable, AddFlightArgs, App, BookArgs, Commands, EditReservationArgs, PassengerArgs,
};
use crate::db::ReservationStore;
use crate::error::Result;
use crate::rules;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use tracing::debug;

fn prompt_text<F>(prompt: &str, validate: F) -> Result<Option<String>>
where
    F: Fn(&str) -> Result<()>,
{
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(true)
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            if input.trim().is_empty() {
                return Ok(());
            }
            validate(input).map_err(|e| e.to_string())
        })
        .interact_text()?;

    let trimmed = input.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Free-text prompt; `None` when left empty.
fn prompt_optional(prompt: &str) -> Result<Option<String>> {
    prompt_text(prompt, |_| Ok(()))
}

/// ID prompt; `None` when left empty or answered with `0`.
fn prompt_id(prompt: &str) -> Result<Option<i32>> {
    let answer = prompt_text(prompt, |s| {
        if s.trim() == "0" {
            return Ok(());
        }
        rules::parse_id(s, "ID").map(|_| ())
    })?;
    match answer.as_deref() {
        None | Some("0") => Ok(None),
        Some(raw) => rules::parse_id(raw, "ID").map(Some),
    }
}

fn cancelled(what: &str) {
    println!("{}", format!("{} cancelled.", what).yellow());
}

/// Asks a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    let answer = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?;
    Ok(answer)
}

/// Collects passenger details; `None` if any field is left empty.
fn prompt_passenger() -> Result<Option<PassengerArgs>> {
    println!("Please enter the passenger's details or press enter at any prompt to cancel.");

    let Some(first_name) = prompt_optional("First Name")? else {
        return Ok(None);
    };
    let Some(last_name) = prompt_optional("Last Name")? else {
        return Ok(None);
    };
    let Some(email) = prompt_text("Email", |s| rules::validate_email(s).map(|_| ()))? else {
        return Ok(None);
    };
    let Some(phone) = prompt_optional("Phone Number")? else {
        return Ok(None);
    };

    Ok(Some(PassengerArgs {
        first_name,
        last_name,
        email,
        phone,
    }))
}

impl<S: ReservationStore> App<S> {
    /// Menu line naming the currently most popular airline.
    pub async fn popular_airline_banner(&self) -> Result<String> {
        let banner = match self.popular_airline().await? {
            Some(popular) => format!("Currently Popular Airline: {}", popular.airline_name),
            None => "Currently Popular Airline: No recommendation available.".to_string(),
        };
        Ok(banner)
    }

    /// Asks for a flight ID until it names a flight with free seats.
    async fn choose_bookable_flight(&self, prompt: &str) -> Result<Option<i32>> {
        loop {
            let Some(flight_id) = prompt_id(prompt)? else {
                return Ok(None);
            };
            match self.store().flight_load(flight_id).await? {
                None => println!(
                    "{}",
                    "Invalid flight ID. Please choose a valid flight ID from the list.".red()
                ),
                Some(load) if !rules::has_capacity(load.booked, load.max_capacity) => println!(
                    "{}",
                    "This flight is fully booked. Please choose another flight.".red()
                ),
                Some(_) => return Ok(Some(flight_id)),
            }
        }
    }

    /// Asks for a seat until it is free on `flight_id`.
    async fn choose_free_seat(&self, flight_id: i32, excluding: Option<i32>) -> Result<Option<String>> {
        loop {
            let Some(raw) = prompt_text("Preferred seat number (e.g., 12A)", |s| {
                rules::normalize_seat(s).map(|_| ())
            })?
            else {
                return Ok(None);
            };
            let seat = rules::normalize_seat(&raw)?;
            if self
                .store()
                .is_seat_available(flight_id, &seat, excluding)
                .await?
            {
                return Ok(Some(seat));
            }
            println!(
                "{}",
                "This seat is already taken. Please choose a different seat.".red()
            );
        }
    }

    pub async fn interactive_add_reservation(&self) -> Result<()> {
        let Some(passenger) = prompt_passenger()? else {
            cancelled("Adding reservation");
            return Ok(());
        };

        self.run_command(Commands::Flights { json: false }).await?;
        let Some(flight_id) = self
            .choose_bookable_flight("Please enter the flight ID you wish to book (0 to exit)")
            .await?
        else {
            cancelled("Adding reservation");
            return Ok(());
        };
        let Some(seat) = self.choose_free_seat(flight_id, None).await? else {
            cancelled("Adding reservation");
            return Ok(());
        };

        debug!("Interactive booking on flight {} seat {}", flight_id, seat);
        self.run_command(Commands::Book(BookArgs {
            passenger,
            flight_id,
            seat,
        }))
        .await
    }

    pub async fn interactive_edit_reservation(&self) -> Result<()> {
        self.run_command(Commands::Reservations { json: false })
            .await?;
        let Some(reservation_id) =
            prompt_id("Enter the Reservation ID you wish to edit (0 to exit)")?
        else {
            println!("Exiting edit reservation process.");
            return Ok(());
        };
        let Some(current) = self.store().find_reservation(reservation_id).await? else {
            println!("{}", "Reservation not found.".red());
            return Ok(());
        };
        if let Err(e) = ensure_editable(&current) {
            println!("{}", e.to_string().red());
            return Ok(());
        }

        self.run_command(Commands::Flights { json: false }).await?;
        let new_flight = prompt_id("Enter new Flight ID (leave blank to keep current)")?;
        let target_flight = new_flight.unwrap_or(current.flight_id);

        let seat_prompt = format!(
            "Enter new Seat Number (leave blank to keep {})",
            current.seat_number
        );
        let new_seat = prompt_text(&seat_prompt, |s| rules::normalize_seat(s).map(|_| ()))?;

        if new_flight.is_none() && new_seat.is_none() {
            println!("No changes made.");
            return Ok(());
        }

        debug!(
            "Interactive edit of reservation {} onto flight {}",
            reservation_id, target_flight
        );
        self.run_command(Commands::EditReservation(EditReservationArgs {
            reservation_id,
            flight_id: new_flight,
            seat: new_seat,
        }))
        .await
    }

    pub async fn interactive_cancel_reservation(&self) -> Result<()> {
        self.run_command(Commands::Reservations { json: false })
            .await?;
        let Some(reservation_id) =
            prompt_id("Enter the Reservation ID you wish to cancel (0 to exit)")?
        else {
            println!("Exiting cancel reservation process.");
            return Ok(());
        };
        self.run_command(Commands::CancelReservation { reservation_id })
            .await
    }

    pub async fn interactive_delete_reservation(&self) -> Result<()> {
        self.run_command(Commands::Reservations { json: false })
            .await?;
        let Some(reservation_id) =
            prompt_id("Enter the Reservation ID you wish to delete (0 to exit)")?
        else {
            println!("Exiting delete reservation process.");
            return Ok(());
        };
        self.run_command(Commands::DeleteReservation {
            reservation_id,
            yes: false,
        })
        .await
    }

    pub async fn interactive_add_flight(&self) -> Result<()> {
        println!("Please enter the new flight details or press enter at any prompt to cancel.");

        let Some(airline) = prompt_optional("Airline Name")? else {
            cancelled("Adding flight");
            return Ok(());
        };
        let Some(flight_number) = prompt_optional("Flight Number")? else {
            cancelled("Adding flight");
            return Ok(());
        };
        let Some(departure_airport) = prompt_optional("Departure Airport")? else {
            cancelled("Adding flight");
            return Ok(());
        };
        let Some(arrival_airport) = prompt_optional("Arrival Airport")? else {
            cancelled("Adding flight");
            return Ok(());
        };

        let departure_prompt = format!("Departure Date and Time ({})", rules::DATETIME_HINT);
        let Some(departure) =
            prompt_text(&departure_prompt, |s| rules::parse_datetime(s).map(|_| ()))?
        else {
            cancelled("Adding flight");
            return Ok(());
        };

        let arrival_prompt = format!("Arrival Date and Time ({})", rules::DATETIME_HINT);
        let departure_at = rules::parse_datetime(&departure)?;
        let Some(arrival) = prompt_text(&arrival_prompt, |s| {
            rules::ensure_time_order(departure_at, rules::parse_datetime(s)?)
        })?
        else {
            cancelled("Adding flight");
            return Ok(());
        };

        let Some(capacity) = prompt_text("Maximum Capacity", |s| rules::parse_capacity(s).map(|_| ()))?
        else {
            cancelled("Adding flight");
            return Ok(());
        };
        let capacity = rules::parse_capacity(&capacity)?;

        self.run_command(Commands::AddFlight(AddFlightArgs {
            airline,
            flight_number,
            departure_airport,
            arrival_airport,
            departure,
            arrival,
            capacity,
        }))
        .await
    }

    pub async fn interactive_remove_flight(&self) -> Result<()> {
        self.run_command(Commands::Flights { json: false }).await?;
        let Some(flight_id) = prompt_id("Enter the Flight ID you wish to remove (0 to exit)")? else {
            println!("Exiting flight removal process.");
            return Ok(());
        };
        self.run_command(Commands::RemoveFlight {
            flight_id,
            yes: false,
        })
        .await
    }
}
