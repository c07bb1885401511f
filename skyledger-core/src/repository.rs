use async_trait::async_trait;

use crate::booking::{Booking, BookingRecord, Reservation, ReserveRequest};
use crate::catalog::{Flight, Passenger};
use crate::error::BookingResult;
use crate::report::{FlightLoad, FlightRevenue, MonthlyRevenue, RouteVolume};

/// Read-only view of the catalog used by the booking core.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn get_flight(&self, id: i64) -> BookingResult<Option<Flight>>;

    async fn get_passenger(&self, id: i64) -> BookingResult<Option<Passenger>>;
}

/// Authoritative store of bookings and tickets.
///
/// The only writer of booking and ticket rows. `reserve` must perform the occupancy
/// check and both inserts as one indivisible step: either it returns a committed
/// reservation, or nothing was written.
#[async_trait]
pub trait InventoryLedger: Send + Sync {
    /// Atomically reserve a seat, failing with `CapacityExceeded`,
    /// `DuplicateActiveBooking`, `SeatTaken`, `InvalidPrice` or `IdentifierCollision`.
    async fn reserve(&self, request: &ReserveRequest) -> BookingResult<Reservation>;

    /// Idempotent transition to CANCELLED. Returns the booking in its terminal state
    /// and whether this call performed the transition.
    async fn cancel(&self, booking_id: i64) -> BookingResult<(Booking, bool)>;

    /// Active tickets on the flight.
    async fn occupancy(&self, flight_id: i64) -> BookingResult<i64>;

    async fn get_booking(&self, booking_id: i64) -> BookingResult<Option<BookingRecord>>;

    async fn list_bookings(&self) -> BookingResult<Vec<BookingRecord>>;

    async fn bookings_for_passenger(&self, passenger_id: i64) -> BookingResult<Vec<BookingRecord>>;

    /// Reprice and/or cancel in one transaction; nothing is written if any part fails.
    /// Returns the booking afterwards and whether this call cancelled it.
    async fn amend(
        &self,
        booking_id: i64,
        price_cents: Option<i64>,
        cancel: bool,
    ) -> BookingResult<(Booking, bool)>;

    /// Administrative hard delete of a booking and its ticket.
    async fn delete_booking(&self, booking_id: i64) -> BookingResult<()>;
}

/// Read-only aggregations over booking history.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn top_routes(&self, limit: i64) -> BookingResult<Vec<RouteVolume>>;

    async fn revenue_by_month(&self) -> BookingResult<Vec<MonthlyRevenue>>;

    async fn load_factor(&self) -> BookingResult<Vec<FlightLoad>>;

    async fn revenue_by_flight(&self) -> BookingResult<Vec<FlightRevenue>>;
}
