//! Table and JSON rendering of listings.

use crate::error::Result;
use crate::models::{BookingStatus, FlightListing, ReservationDetails};
use crate::rules::DATETIME_FORMAT;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

pub fn flights_table(flights: &[FlightListing]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Flight ID",
            "Airline",
            "Flight Number",
            "Departure",
            "Arrival",
            "Departure Time",
            "Arrival Time",
            "Seats Left",
        ]);

    for f in flights {
        let seats_left = f.seats_left();
        let seats = Cell::new(format!("{}/{}", seats_left, f.max_capacity));
        let seats = if seats_left == 0 {
            seats.fg(Color::Red)
        } else {
            seats
        };
        table.add_row(vec![
            Cell::new(f.flight_id),
            Cell::new(&f.airline_name),
            Cell::new(&f.flight_number),
            Cell::new(&f.departure_airport),
            Cell::new(&f.arrival_airport),
            Cell::new(f.departure_datetime.format(DATETIME_FORMAT)),
            Cell::new(f.arrival_datetime.format(DATETIME_FORMAT)),
            seats,
        ]);
    }
    table
}

pub fn reservations_table(reservations: &[ReservationDetails]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Reservation ID",
            "Passenger",
            "Flight ID",
            "Flight",
            "Seat",
            "Status",
        ]);

    for r in reservations {
        let status = Cell::new(r.booking_status);
        let status = match r.booking_status {
            BookingStatus::Confirmed => status.fg(Color::Green),
            BookingStatus::Cancelled => status.fg(Color::DarkGrey),
        };
        table.add_row(vec![
            Cell::new(r.reservation_id),
            Cell::new(r.passenger_name()),
            Cell::new(r.flight_id),
            Cell::new(format!("{} {}", r.airline_name, r.flight_number)),
            Cell::new(&r.seat_number),
            status,
        ]);
    }
    table
}

/// Pretty-prints any serializable listing to stdout.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
