use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BookingError;

/// Booking lifecycle. Cancellation is terminal; a cancelled booking is never
/// reinstated, the passenger books again instead.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "BOOKED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BOOKED" => Ok(BookingStatus::Booked),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(BookingError::validation(format!("unknown booking status '{}'", other))),
        }
    }
}

/// Cabin class printed on the ticket.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketClass {
    #[default]
    Economy,
    Business,
    First,
}

impl TicketClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketClass::Economy => "ECONOMY",
            TicketClass::Business => "BUSINESS",
            TicketClass::First => "FIRST",
        }
    }
}

impl fmt::Display for TicketClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketClass {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ECONOMY" => Ok(TicketClass::Economy),
            "BUSINESS" => Ok(TicketClass::Business),
            "FIRST" => Ok(TicketClass::First),
            other => Err(BookingError::validation(format!("unknown ticket class '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub passenger_id: i64,
    pub flight_id: i64,
    pub status: BookingStatus,
    pub price_cents: i64,
    pub booked_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Booked
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: i64,
    pub booking_id: i64,
    pub ticket_no: String,
    pub seat_no: String,
    pub class: TicketClass,
}

/// Input to the ledger's atomic reserve step. The price is already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ReserveRequest {
    pub passenger_id: i64,
    pub flight_id: i64,
    pub price_cents: i64,
    pub class: TicketClass,
    pub seat_no: Option<String>,
}

/// A committed Booking and its Ticket. Only ever built after the transaction that
/// wrote both rows has committed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub booking: Booking,
    pub ticket: Ticket,
}

/// What a caller gets back from a successful booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Confirmation {
    pub booking_id: i64,
    pub ticket_id: i64,
    pub ticket_no: String,
    pub seat_no: String,
    pub class: TicketClass,
    pub status: BookingStatus,
    pub price_cents: i64,
    pub passenger_id: i64,
    pub flight_id: i64,
    pub booked_at: DateTime<Utc>,
}

impl From<Reservation> for Confirmation {
    fn from(r: Reservation) -> Self {
        Self {
            booking_id: r.booking.id,
            ticket_id: r.ticket.id,
            ticket_no: r.ticket.ticket_no,
            seat_no: r.ticket.seat_no,
            class: r.ticket.class,
            status: r.booking.status,
            price_cents: r.booking.price_cents,
            passenger_id: r.booking.passenger_id,
            flight_id: r.booking.flight_id,
            booked_at: r.booking.booked_at,
        }
    }
}

/// Read model for booking listings: a booking joined with its passenger, flight and
/// ticket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingRecord {
    pub booking_id: i64,
    pub status: BookingStatus,
    pub price_cents: i64,
    pub booked_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub passenger_id: i64,
    pub passenger_name: String,
    pub flight_id: i64,
    pub flight_code: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub ticket_no: Option<String>,
    pub seat_no: Option<String>,
    pub class: Option<TicketClass>,
}

/// Administrative correction of a booking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingPatch {
    pub price_cents: Option<i64>,
    pub status: Option<BookingStatus>,
}
