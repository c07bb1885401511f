use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use skyledger_core::access::require;
use skyledger_core::repository::{CatalogReader, InventoryLedger};
use skyledger_core::{
    Booking, BookingError, BookingPatch, BookingRecord, BookingResult, BookingStatus,
    Confirmation, Operation, ReserveRequest, Role, TicketClass,
};

use crate::events::{self, BookingEvent};

/// What a caller asks for. A missing price means the flight's base fare.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingRequest {
    pub passenger_id: i64,
    pub flight_id: i64,
    #[serde(default)]
    pub class: TicketClass,
    pub price_cents: Option<i64>,
    pub seat_no: Option<String>,
}

/// Orchestrates bookings: authorize, resolve against the catalog, then hand the
/// indivisible part to the ledger.
pub struct BookingService {
    catalog: Arc<dyn CatalogReader>,
    ledger: Arc<dyn InventoryLedger>,
    events: broadcast::Sender<BookingEvent>,
    recheck_departure: bool,
}

impl BookingService {
    pub fn new(catalog: Arc<dyn CatalogReader>, ledger: Arc<dyn InventoryLedger>) -> Self {
        Self {
            catalog,
            ledger,
            events: events::channel(),
            recheck_departure: true,
        }
    }

    /// Whether to refuse bookings on flights that have already departed.
    pub fn with_departure_check(mut self, enabled: bool) -> Self {
        self.recheck_departure = enabled;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BookingEvent> {
        self.events.subscribe()
    }

    pub async fn book(&self, role: Option<Role>, request: &BookingRequest) -> BookingResult<Confirmation> {
        require(role, Operation::Book)?;

        let flight = self
            .catalog
            .get_flight(request.flight_id)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", request.flight_id))?;
        self.catalog
            .get_passenger(request.passenger_id)
            .await?
            .ok_or_else(|| BookingError::not_found("passenger", request.passenger_id))?;

        // Some(0) is a real fare and is kept.
        let price_cents = request.price_cents.unwrap_or(flight.base_price_cents);
        if price_cents < 0 {
            return Err(BookingError::InvalidPrice(price_cents));
        }

        if self.recheck_departure && flight.departure_time <= Utc::now() {
            return Err(BookingError::InvalidSchedule(format!(
                "flight {} departed at {}",
                flight.code,
                flight.departure_time.to_rfc3339()
            )));
        }

        let reserve = ReserveRequest {
            passenger_id: request.passenger_id,
            flight_id: flight.id,
            price_cents,
            class: request.class,
            seat_no: request.seat_no.clone(),
        };

        let reservation = match self.ledger.reserve(&reserve).await {
            Ok(r) => r,
            Err(e @ BookingError::CapacityExceeded { .. }) | Err(e @ BookingError::DuplicateActiveBooking { .. }) => {
                warn!("Booking rejected on flight {}: {}", flight.code, e);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        info!(
            "Booked passenger {} on {} (seat {}, ticket {})",
            request.passenger_id, flight.code, reservation.ticket.seat_no, reservation.ticket.ticket_no
        );
        let _ = self.events.send(BookingEvent::confirmed(&reservation));
        Ok(Confirmation::from(reservation))
    }

    pub async fn cancel(&self, role: Option<Role>, booking_id: i64) -> BookingResult<Booking> {
        require(role, Operation::CancelBooking)?;
        let (booking, changed) = self.ledger.cancel(booking_id).await?;
        if changed {
            let _ = self.events.send(BookingEvent::cancelled(&booking));
        }
        Ok(booking)
    }

    pub async fn list_bookings(&self, role: Option<Role>) -> BookingResult<Vec<BookingRecord>> {
        require(role, Operation::ListBookings)?;
        self.ledger.list_bookings().await
    }

    pub async fn bookings_for_passenger(
        &self,
        role: Option<Role>,
        passenger_id: i64,
    ) -> BookingResult<Vec<BookingRecord>> {
        require(role, Operation::ListPassengerBookings)?;
        self.ledger.bookings_for_passenger(passenger_id).await
    }

    pub async fn get_booking(&self, role: Option<Role>, booking_id: i64) -> BookingResult<BookingRecord> {
        require(role, Operation::ListBookings)?;
        self.ledger
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))
    }

    /// Reprice and/or cancel. Moving a cancelled booking back to BOOKED is refused: the
    /// seat may be gone, so the passenger has to book again.
    pub async fn update_booking(
        &self,
        role: Option<Role>,
        booking_id: i64,
        patch: &BookingPatch,
    ) -> BookingResult<BookingRecord> {
        require(role, Operation::UpdateBooking)?;

        let current = self
            .ledger
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;

        if patch.status == Some(BookingStatus::Booked) && current.status == BookingStatus::Cancelled {
            return Err(BookingError::validation(
                "a cancelled booking cannot be reinstated; make a new booking",
            ));
        }
        if let Some(price) = patch.price_cents.filter(|p| *p < 0) {
            return Err(BookingError::InvalidPrice(price));
        }

        let cancel = patch.status == Some(BookingStatus::Cancelled);
        if patch.price_cents.is_some() || cancel {
            let (booking, cancelled) = self.ledger.amend(booking_id, patch.price_cents, cancel).await?;
            if cancelled {
                let _ = self.events.send(BookingEvent::cancelled(&booking));
            }
        }

        self.ledger
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))
    }

    pub async fn delete_booking(&self, role: Option<Role>, booking_id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteBooking)?;
        self.ledger.delete_booking(booking_id).await?;
        warn!("Booking {} hard-deleted by administrator", booking_id);
        Ok(())
    }
}
