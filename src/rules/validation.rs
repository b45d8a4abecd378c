//! Input validation and booking predicates.
//!
//! Every function here is pure: no database access. The store and the CLI both call
//! into this module so the in-memory and PostgreSQL paths agree on the rules.

use crate::error::{AppError, Result};
use crate::models::{NewFlight, NewPassenger};
use chrono::NaiveDateTime;

/// Accepted datetime layout for departure/arrival input and display.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Human-readable form of [`DATETIME_FORMAT`] used in prompts.
pub const DATETIME_HINT: &str = "YYYY-MM-DD HH:MM:SS";

const MAX_SEAT_LEN: usize = 5;

/// Raw flight fields as typed by the operator.
#[derive(Debug, Clone, Copy)]
pub struct FlightDraft<'a> {
    pub airline_name: &'a str,
    pub flight_number: &'a str,
    pub departure_airport: &'a str,
    pub arrival_airport: &'a str,
    pub departure_datetime: &'a str,
    pub arrival_datetime: &'a str,
    pub max_capacity: i32,
}

/// Trims `value` and rejects it when empty.
pub fn require(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required.", field)));
    }
    Ok(trimmed.to_string())
}

/// Parses a `YYYY-MM-DD HH:MM:SS` timestamp.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input.trim(), DATETIME_FORMAT).map_err(|_| {
        AppError::validation(format!(
            "Invalid datetime '{}'. Please use the format {}.",
            input.trim(),
            DATETIME_HINT
        ))
    })
}

/// Arrival may equal departure but must not precede it.
pub fn ensure_time_order(departure: NaiveDateTime, arrival: NaiveDateTime) -> Result<()> {
    if arrival < departure {
        return Err(AppError::validation(
            "Arrival time is before departure time.",
        ));
    }
    Ok(())
}

/// Parses a strictly positive seat capacity.
pub fn parse_capacity(input: &str) -> Result<i32> {
    let capacity: i32 = input
        .trim()
        .parse()
        .map_err(|_| AppError::validation("Maximum capacity must be an integer."))?;
    check_capacity(capacity)?;
    Ok(capacity)
}

fn check_capacity(capacity: i32) -> Result<()> {
    if capacity <= 0 {
        return Err(AppError::validation(
            "Maximum capacity must be a positive integer.",
        ));
    }
    Ok(())
}

/// Parses a positive database identifier such as a flight or reservation id.
pub fn parse_id(input: &str, what: &str) -> Result<i32> {
    match input.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::validation(format!(
            "{} must be a positive integer.",
            what
        ))),
    }
}

/// Normalizes a seat label such as `12a` to `12A`.
pub fn normalize_seat(input: &str) -> Result<String> {
    let seat = input.trim().to_ascii_uppercase();
    if seat.is_empty()
        || seat.len() > MAX_SEAT_LEN
        || !seat.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return Err(AppError::validation(format!(
            "Invalid seat number '{}'. Use up to {} letters or digits, e.g. 12A.",
            input.trim(),
            MAX_SEAT_LEN
        )));
    }
    Ok(seat)
}

/// Loose structural email check: one `@`, a local part, and a dotted domain.
pub fn validate_email(input: &str) -> Result<String> {
    let email = input.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        },
        None => false,
    };
    if !valid {
        return Err(AppError::validation(format!(
            "Invalid email address '{}'.",
            email
        )));
    }
    Ok(email.to_ascii_lowercase())
}

/// True while a flight still has room for one more confirmed reservation.
pub fn has_capacity(booked: i64, max_capacity: i32) -> bool {
    booked < i64::from(max_capacity)
}

/// Validates raw flight fields into a [`NewFlight`].
pub fn validate_new_flight(draft: &FlightDraft<'_>) -> Result<NewFlight> {
    let airline_name = require("Airline name", draft.airline_name)?;
    let flight_number = require("Flight number", draft.flight_number)?.to_ascii_uppercase();
    let departure_airport = require("Departure airport", draft.departure_airport)?;
    let arrival_airport = require("Arrival airport", draft.arrival_airport)?;
    let departure_datetime = parse_datetime(draft.departure_datetime)?;
    let arrival_datetime = parse_datetime(draft.arrival_datetime)?;
    ensure_time_order(departure_datetime, arrival_datetime)?;
    check_capacity(draft.max_capacity)?;

    Ok(NewFlight {
        airline_name,
        flight_number,
        departure_airport,
        arrival_airport,
        departure_datetime,
        arrival_datetime,
        max_capacity: draft.max_capacity,
    })
}

/// Validates raw passenger fields into a [`NewPassenger`].
pub fn validate_new_passenger(
    first_name: &str,
    last_name: &str,
    email: &str,
    phone_number: &str,
) -> Result<NewPassenger> {
    Ok(NewPassenger {
        first_name: require("First name", first_name)?,
        last_name: require("Last name", last_name)?,
        email: validate_email(email)?,
        phone_number: require("Phone number", phone_number)?,
    })
}
