use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

use skyledger_core::{Booking, Reservation};

/// Buffered events per subscriber before a slow one starts lagging.
pub const EVENT_BUFFER: usize = 100;

/// Published after a booking change has committed. Delivery is best effort: with no
/// subscribers the event is simply dropped.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEvent {
    Confirmed {
        booking_id: i64,
        passenger_id: i64,
        flight_id: i64,
        seat_no: String,
        ticket_no: String,
        at: DateTime<Utc>,
    },
    Cancelled {
        booking_id: i64,
        passenger_id: i64,
        flight_id: i64,
        at: DateTime<Utc>,
    },
}

impl BookingEvent {
    pub fn confirmed(reservation: &Reservation) -> Self {
        BookingEvent::Confirmed {
            booking_id: reservation.booking.id,
            passenger_id: reservation.booking.passenger_id,
            flight_id: reservation.booking.flight_id,
            seat_no: reservation.ticket.seat_no.clone(),
            ticket_no: reservation.ticket.ticket_no.clone(),
            at: reservation.booking.booked_at,
        }
    }

    pub fn cancelled(booking: &Booking) -> Self {
        BookingEvent::Cancelled {
            booking_id: booking.id,
            passenger_id: booking.passenger_id,
            flight_id: booking.flight_id,
            at: booking.cancelled_at.unwrap_or_else(Utc::now),
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            BookingEvent::Confirmed { .. } => "booking_confirmed",
            BookingEvent::Cancelled { .. } => "booking_cancelled",
        }
    }

    pub fn flight_id(&self) -> i64 {
        match self {
            BookingEvent::Confirmed { flight_id, .. } | BookingEvent::Cancelled { flight_id, .. } => {
                *flight_id
            }
        }
    }
}

pub fn channel() -> broadcast::Sender<BookingEvent> {
    let (tx, _) = broadcast::channel(EVENT_BUFFER);
    tx
}
