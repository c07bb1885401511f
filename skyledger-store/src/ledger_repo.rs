use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::{debug, info, warn};

use skyledger_core::identifiers::{canonical_seat, next_seat_slot};
use skyledger_core::repository::InventoryLedger;
use skyledger_core::{
    Booking, BookingError, BookingRecord, BookingResult, BookingStatus, Reservation,
    ReserveRequest, Ticket, TicketClass, TicketIssuer,
};

use crate::error::{is_foreign_key_violation, is_unique_violation, storage};
use crate::flight_locks::FlightLocks;

/// Inserts the booking only if the flight still has a free seat and the passenger has no
/// active booking on it. Being the first statement of the transaction, it also takes the
/// database write lock, so the occupancy it reads cannot change before commit.
const RESERVE_INSERT: &str = r#"
    INSERT INTO booking (passenger_id, flight_id, status, price_cents, booked_at)
    SELECT ?1, ?2, 'BOOKED', ?3, ?4
    WHERE (
        SELECT COUNT(t.id)
        FROM ticket t
        JOIN booking b ON b.id = t.booking_id
        WHERE b.flight_id = ?2 AND b.status = 'BOOKED'
    ) < (
        SELECT a.capacity
        FROM flight f
        JOIN aircraft a ON a.id = f.aircraft_id
        WHERE f.id = ?2
    )
    AND NOT EXISTS (
        SELECT 1 FROM booking
        WHERE passenger_id = ?1 AND flight_id = ?2 AND status = 'BOOKED'
    )
"#;

const OCCUPANCY: &str = r#"
    SELECT COUNT(t.id)
    FROM ticket t
    JOIN booking b ON b.id = t.booking_id
    WHERE b.flight_id = ? AND b.status = 'BOOKED'
"#;

const RECORD_SELECT: &str = r#"
    SELECT b.id AS booking_id, b.status, b.price_cents, b.booked_at, b.cancelled_at,
           p.id AS passenger_id, p.name AS passenger_name,
           f.id AS flight_id, f.code AS flight_code, f.departure_time, f.arrival_time,
           t.ticket_no, t.seat_no, t.class
    FROM booking b
    JOIN passenger p ON p.id = b.passenger_id
    JOIN flight f ON f.id = b.flight_id
    LEFT JOIN ticket t ON t.booking_id = b.id
"#;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    passenger_id: i64,
    flight_id: i64,
    status: String,
    price_cents: i64,
    booked_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = BookingError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            passenger_id: row.passenger_id,
            flight_id: row.flight_id,
            status: row.status.parse()?,
            price_cents: row.price_cents,
            booked_at: row.booked_at,
            cancelled_at: row.cancelled_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    booking_id: i64,
    status: String,
    price_cents: i64,
    booked_at: DateTime<Utc>,
    cancelled_at: Option<DateTime<Utc>>,
    passenger_id: i64,
    passenger_name: String,
    flight_id: i64,
    flight_code: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    ticket_no: Option<String>,
    seat_no: Option<String>,
    class: Option<String>,
}

impl TryFrom<RecordRow> for BookingRecord {
    type Error = BookingError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let class = match row.class {
            Some(c) => Some(c.parse::<TicketClass>()?),
            None => None,
        };
        Ok(BookingRecord {
            booking_id: row.booking_id,
            status: row.status.parse()?,
            price_cents: row.price_cents,
            booked_at: row.booked_at,
            cancelled_at: row.cancelled_at,
            passenger_id: row.passenger_id,
            passenger_name: row.passenger_name,
            flight_id: row.flight_id,
            flight_code: row.flight_code,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            ticket_no: row.ticket_no,
            seat_no: row.seat_no,
            class,
        })
    }
}

/// SQLite-backed inventory ledger. The only writer of booking and ticket rows.
pub struct SqliteLedger {
    pool: SqlitePool,
    locks: FlightLocks,
    issuer: Arc<dyn TicketIssuer>,
    attempts: u32,
}

impl SqliteLedger {
    pub fn new(pool: SqlitePool, issuer: Arc<dyn TicketIssuer>, attempts: u32) -> Self {
        Self {
            pool,
            locks: FlightLocks::new(),
            issuer,
            attempts: attempts.max(1),
        }
    }

    /// The conditional insert wrote nothing: work out which rule stopped it.
    async fn rejection(
        tx: &mut Transaction<'_, Sqlite>,
        request: &ReserveRequest,
    ) -> BookingResult<BookingError> {
        let capacity: Option<i64> = sqlx::query_scalar(
            "SELECT a.capacity FROM flight f JOIN aircraft a ON a.id = f.aircraft_id WHERE f.id = ?",
        )
        .bind(request.flight_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage)?;

        let Some(capacity) = capacity else {
            return Ok(BookingError::not_found("flight", request.flight_id));
        };

        let occupied: i64 = sqlx::query_scalar(OCCUPANCY)
            .bind(request.flight_id)
            .fetch_one(&mut **tx)
            .await
            .map_err(storage)?;

        if occupied >= capacity {
            Ok(BookingError::CapacityExceeded {
                flight_id: request.flight_id,
                capacity,
            })
        } else {
            Ok(BookingError::DuplicateActiveBooking {
                passenger_id: request.passenger_id,
                flight_id: request.flight_id,
            })
        }
    }

    async fn assign_seat(
        tx: &mut Transaction<'_, Sqlite>,
        request: &ReserveRequest,
    ) -> BookingResult<String> {
        if let Some(seat) = &request.seat_no {
            if seat.trim().is_empty() {
                return Err(BookingError::validation("seat must not be empty"));
            }
            let seat = canonical_seat(seat);
            let held: Option<i64> = sqlx::query_scalar(
                r#"
                SELECT 1 FROM ticket t
                JOIN booking b ON b.id = t.booking_id
                WHERE b.flight_id = ? AND b.status = 'BOOKED' AND t.seat_no = ?
                "#,
            )
            .bind(request.flight_id)
            .bind(&seat)
            .fetch_optional(&mut **tx)
            .await
            .map_err(storage)?;

            if held.is_some() {
                return Err(BookingError::SeatTaken {
                    flight_id: request.flight_id,
                    seat_no: seat,
                });
            }
            return Ok(seat);
        }

        let taken: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT t.seat_no FROM ticket t
            JOIN booking b ON b.id = t.booking_id
            WHERE b.flight_id = ? AND b.status = 'BOOKED'
            "#,
        )
        .bind(request.flight_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(storage)?;

        Ok(next_seat_slot(taken.iter().map(String::as_str)).to_string())
    }

    async fn issue_ticket_no(&self, tx: &mut Transaction<'_, Sqlite>) -> BookingResult<String> {
        for attempt in 1..=self.attempts {
            let candidate = self.issuer.candidate();
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM ticket WHERE ticket_no = ?")
                .bind(&candidate)
                .fetch_optional(&mut **tx)
                .await
                .map_err(storage)?;
            if exists.is_none() {
                return Ok(candidate);
            }
            debug!("Ticket number {} already issued (attempt {})", candidate, attempt);
        }
        warn!("Gave up issuing a ticket number after {} attempts", self.attempts);
        Err(BookingError::IdentifierCollision {
            attempts: self.attempts,
        })
    }

    async fn fetch_booking(
        tx: &mut Transaction<'_, Sqlite>,
        booking_id: i64,
    ) -> BookingResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, passenger_id, flight_id, status, price_cents, booked_at, cancelled_at FROM booking WHERE id = ?",
        )
        .bind(booking_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage)?;
        row.map(Booking::try_from).transpose()
    }
}

#[async_trait]
impl InventoryLedger for SqliteLedger {
    async fn reserve(&self, request: &ReserveRequest) -> BookingResult<Reservation> {
        if request.price_cents < 0 {
            return Err(BookingError::InvalidPrice(request.price_cents));
        }

        // Flight lock before connection: never hold a connection while queued.
        let _flight = self.locks.acquire(request.flight_id).await;
        let booked_at = Utc::now();

        // Any early return below drops `tx`, which rolls back the booking row.
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let inserted = sqlx::query(RESERVE_INSERT)
            .bind(request.passenger_id)
            .bind(request.flight_id)
            .bind(request.price_cents)
            .bind(booked_at)
            .execute(&mut *tx)
            .await;

        let booking_id = match inserted {
            Ok(done) if done.rows_affected() == 1 => done.last_insert_rowid(),
            Ok(_) => return Err(Self::rejection(&mut tx, request).await?),
            Err(e) if is_unique_violation(&e) => {
                return Err(BookingError::DuplicateActiveBooking {
                    passenger_id: request.passenger_id,
                    flight_id: request.flight_id,
                })
            }
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(BookingError::not_found("passenger", request.passenger_id))
            }
            Err(e) => return Err(storage(e)),
        };

        let seat_no = Self::assign_seat(&mut tx, request).await?;
        let ticket_no = self.issue_ticket_no(&mut tx).await?;

        let ticket_id = sqlx::query(
            "INSERT INTO ticket (booking_id, ticket_no, seat_no, class) VALUES (?, ?, ?, ?)",
        )
        .bind(booking_id)
        .bind(&ticket_no)
        .bind(&seat_no)
        .bind(request.class.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::IdentifierCollision {
                    attempts: self.attempts,
                }
            } else {
                storage(e)
            }
        })?
        .last_insert_rowid();

        tx.commit().await.map_err(storage)?;

        info!(
            "Booking {} confirmed: passenger {} on flight {}, seat {}, ticket {}",
            booking_id, request.passenger_id, request.flight_id, seat_no, ticket_no
        );

        Ok(Reservation {
            booking: Booking {
                id: booking_id,
                passenger_id: request.passenger_id,
                flight_id: request.flight_id,
                status: BookingStatus::Booked,
                price_cents: request.price_cents,
                booked_at,
                cancelled_at: None,
            },
            ticket: Ticket {
                id: ticket_id,
                booking_id,
                ticket_no,
                seat_no,
                class: request.class,
            },
        })
    }

    async fn cancel(&self, booking_id: i64) -> BookingResult<(Booking, bool)> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let changed = sqlx::query(
            "UPDATE booking SET status = 'CANCELLED', cancelled_at = ? WHERE id = ? AND status = 'BOOKED'",
        )
        .bind(Utc::now())
        .bind(booking_id)
        .execute(&mut *tx)
        .await
        .map_err(storage)?
        .rows_affected()
            == 1;

        let booking = Self::fetch_booking(&mut tx, booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;

        tx.commit().await.map_err(storage)?;

        if changed {
            info!("Booking {} cancelled, seat released on flight {}", booking_id, booking.flight_id);
        } else {
            debug!("Booking {} was already cancelled", booking_id);
        }
        Ok((booking, changed))
    }

    async fn occupancy(&self, flight_id: i64) -> BookingResult<i64> {
        sqlx::query_scalar(OCCUPANCY)
            .bind(flight_id)
            .fetch_one(&self.pool)
            .await
            .map_err(storage)
    }

    async fn get_booking(&self, booking_id: i64) -> BookingResult<Option<BookingRecord>> {
        let sql = format!("{} WHERE b.id = ?", RECORD_SELECT);
        let row = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(BookingRecord::try_from).transpose()
    }

    async fn list_bookings(&self) -> BookingResult<Vec<BookingRecord>> {
        let sql = format!("{} ORDER BY b.id", RECORD_SELECT);
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(BookingRecord::try_from).collect()
    }

    async fn bookings_for_passenger(&self, passenger_id: i64) -> BookingResult<Vec<BookingRecord>> {
        let sql = format!("{} WHERE b.passenger_id = ? ORDER BY b.booked_at, b.id", RECORD_SELECT);
        let rows = sqlx::query_as::<_, RecordRow>(&sql)
            .bind(passenger_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        rows.into_iter().map(BookingRecord::try_from).collect()
    }

    async fn amend(
        &self,
        booking_id: i64,
        price_cents: Option<i64>,
        cancel: bool,
    ) -> BookingResult<(Booking, bool)> {
        if let Some(price) = price_cents.filter(|p| *p < 0) {
            return Err(BookingError::InvalidPrice(price));
        }
        let mut tx = self.pool.begin().await.map_err(storage)?;

        if let Some(price) = price_cents {
            let updated = sqlx::query("UPDATE booking SET price_cents = ? WHERE id = ?")
                .bind(price)
                .bind(booking_id)
                .execute(&mut *tx)
                .await
                .map_err(storage)?
                .rows_affected();
            if updated == 0 {
                return Err(BookingError::not_found("booking", booking_id));
            }
        }

        let cancelled = cancel
            && sqlx::query(
                "UPDATE booking SET status = 'CANCELLED', cancelled_at = ? WHERE id = ? AND status = 'BOOKED'",
            )
            .bind(Utc::now())
            .bind(booking_id)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected()
                == 1;

        let booking = Self::fetch_booking(&mut tx, booking_id)
            .await?
            .ok_or_else(|| BookingError::not_found("booking", booking_id))?;
        tx.commit().await.map_err(storage)?;

        if let Some(price) = price_cents {
            info!("Booking {} repriced to {} cents", booking_id, price);
        }
        if cancelled {
            info!("Booking {} cancelled, seat released on flight {}", booking_id, booking.flight_id);
        }
        Ok((booking, cancelled))
    }

    async fn delete_booking(&self, booking_id: i64) -> BookingResult<()> {
        // The ticket row goes with it (ON DELETE CASCADE).
        let deleted = sqlx::query("DELETE FROM booking WHERE id = ?")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?
            .rows_affected();
        if deleted == 0 {
            return Err(BookingError::not_found("booking", booking_id));
        }
        info!("Booking {} deleted", booking_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_repo::SqliteCatalog;
    use crate::database::DbClient;
    use chrono::Duration;
    use skyledger_core::catalog::{Flight, NewAircraft, NewAirport, NewFlight, NewPassenger, Passenger};
    use skyledger_core::RandomTicketIssuer;

    struct FixedIssuer;

    impl TicketIssuer for FixedIssuer {
        fn candidate(&self) -> String {
            "SL0000000001".to_string()
        }
    }

    async fn setup(
        capacity: i64,
        passengers: usize,
        issuer: Arc<dyn TicketIssuer>,
    ) -> (SqliteLedger, Flight, Vec<Passenger>) {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let catalog = SqliteCatalog::new(db.pool.clone());

        for (code, city) in [("LHR", "London"), ("DXB", "Dubai")] {
            catalog
                .create_airport(&NewAirport {
                    code: code.into(),
                    name: format!("{} Airport", city),
                    city: city.into(),
                    country: "XX".into(),
                })
                .await
                .unwrap();
        }
        let aircraft = catalog
            .create_aircraft(&NewAircraft { model: "Test Jet".into(), capacity })
            .await
            .unwrap();
        let departure = Utc::now() + Duration::days(2);
        let flight = catalog
            .create_flight(&NewFlight {
                code: "SL101".into(),
                origin: "LHR".into(),
                destination: "DXB".into(),
                departure_time: departure,
                arrival_time: departure + Duration::hours(7),
                aircraft_id: aircraft.id,
                base_price_cents: 10000,
            })
            .await
            .unwrap();

        let mut people = Vec::new();
        for i in 0..passengers {
            people.push(
                catalog
                    .create_passenger(&NewPassenger {
                        name: format!("Passenger {}", i),
                        email: format!("p{}@example.com", i),
                    })
                    .await
                    .unwrap(),
            );
        }

        (SqliteLedger::new(db.pool, issuer, 5), flight, people)
    }

    fn request(passenger: &Passenger, flight: &Flight) -> ReserveRequest {
        ReserveRequest {
            passenger_id: passenger.id,
            flight_id: flight.id,
            price_cents: 10000,
            class: TicketClass::Economy,
            seat_no: None,
        }
    }

    fn random_issuer() -> Arc<dyn TicketIssuer> {
        Arc::new(RandomTicketIssuer::seeded("SL", 1))
    }

    #[tokio::test]
    async fn test_fills_to_capacity_then_rejects() {
        let (ledger, flight, people) = setup(2, 3, random_issuer()).await;

        let first = ledger.reserve(&request(&people[0], &flight)).await.unwrap();
        let second = ledger.reserve(&request(&people[1], &flight)).await.unwrap();
        assert_eq!(first.ticket.seat_no, "1");
        assert_eq!(second.ticket.seat_no, "2");
        assert_ne!(first.ticket.ticket_no, second.ticket.ticket_no);

        let err = ledger.reserve(&request(&people[2], &flight)).await.unwrap_err();
        assert!(matches!(err, BookingError::CapacityExceeded { capacity: 2, .. }));
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 2);
        assert!(ledger.bookings_for_passenger(people[2].id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_frees_seat_for_reuse() {
        let (ledger, flight, people) = setup(2, 3, random_issuer()).await;
        let first = ledger.reserve(&request(&people[0], &flight)).await.unwrap();
        ledger.reserve(&request(&people[1], &flight)).await.unwrap();

        let (cancelled, changed) = ledger.cancel(first.booking.id).await.unwrap();
        assert!(changed);
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 1);

        let third = ledger.reserve(&request(&people[2], &flight)).await.unwrap();
        assert_eq!(third.ticket.seat_no, "1");
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (ledger, flight, people) = setup(2, 1, random_issuer()).await;
        let booked = ledger.reserve(&request(&people[0], &flight)).await.unwrap();

        let (first, changed) = ledger.cancel(booked.booking.id).await.unwrap();
        assert!(changed);
        let (second, changed_again) = ledger.cancel(booked.booking.id).await.unwrap();
        assert!(!changed_again);
        assert_eq!(first.cancelled_at, second.cancelled_at);
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 0);

        assert!(matches!(
            ledger.cancel(9999).await,
            Err(BookingError::NotFound { entity: "booking", .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_active_booking_rejected_then_allowed_after_cancel() {
        let (ledger, flight, people) = setup(5, 1, random_issuer()).await;
        let booked = ledger.reserve(&request(&people[0], &flight)).await.unwrap();

        let err = ledger.reserve(&request(&people[0], &flight)).await.unwrap_err();
        assert!(matches!(err, BookingError::DuplicateActiveBooking { .. }));

        ledger.cancel(booked.booking.id).await.unwrap();
        let again = ledger.reserve(&request(&people[0], &flight)).await.unwrap();
        assert_ne!(again.booking.id, booked.booking.id);

        let history = ledger.bookings_for_passenger(people[0].id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.iter().filter(|r| r.status == BookingStatus::Booked).count(), 1);
    }

    #[tokio::test]
    async fn test_negative_price_writes_nothing() {
        let (ledger, flight, people) = setup(2, 1, random_issuer()).await;
        let mut req = request(&people[0], &flight);
        req.price_cents = -1;
        assert!(matches!(ledger.reserve(&req).await, Err(BookingError::InvalidPrice(-1))));
        assert!(ledger.list_bookings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_zero_price_is_accepted() {
        let (ledger, flight, people) = setup(2, 1, random_issuer()).await;
        let mut req = request(&people[0], &flight);
        req.price_cents = 0;
        let booked = ledger.reserve(&req).await.unwrap();
        assert_eq!(booked.booking.price_cents, 0);
    }

    #[tokio::test]
    async fn test_ticket_number_collision_rolls_back() {
        let (ledger, flight, people) = setup(5, 2, Arc::new(FixedIssuer)).await;
        ledger.reserve(&request(&people[0], &flight)).await.unwrap();

        let err = ledger.reserve(&request(&people[1], &flight)).await.unwrap_err();
        assert!(matches!(err, BookingError::IdentifierCollision { attempts: 5 }));
        assert!(ledger.bookings_for_passenger(people[1].id).await.unwrap().is_empty());
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_requested_seat_must_be_free() {
        let (ledger, flight, people) = setup(5, 3, random_issuer()).await;
        let mut req = request(&people[0], &flight);
        req.seat_no = Some("12A".into());
        let first = ledger.reserve(&req).await.unwrap();
        assert_eq!(first.ticket.seat_no, "12A");

        let mut clash = request(&people[1], &flight);
        clash.seat_no = Some("12A".into());
        let err = ledger.reserve(&clash).await.unwrap_err();
        assert!(matches!(err, BookingError::SeatTaken { .. }));
        assert!(ledger.bookings_for_passenger(people[1].id).await.unwrap().is_empty());

        // Agent-assigned labels do not consume numeric slots.
        let auto = ledger.reserve(&request(&people[2], &flight)).await.unwrap();
        assert_eq!(auto.ticket.seat_no, "1");
    }

    #[tokio::test]
    async fn test_numeric_seat_spelling_cannot_double_sell() {
        let (ledger, flight, people) = setup(5, 3, random_issuer()).await;
        let auto = ledger.reserve(&request(&people[0], &flight)).await.unwrap();
        assert_eq!(auto.ticket.seat_no, "1");

        for spelling in ["01", "+1"] {
            let mut clash = request(&people[1], &flight);
            clash.seat_no = Some(spelling.into());
            let err = ledger.reserve(&clash).await.unwrap_err();
            assert!(
                matches!(&err, BookingError::SeatTaken { seat_no, .. } if seat_no == "1"),
                "{} was sold twice: {:?}",
                spelling,
                err
            );
        }

        let mut padded = request(&people[2], &flight);
        padded.seat_no = Some("007".into());
        let held = ledger.reserve(&padded).await.unwrap();
        assert_eq!(held.ticket.seat_no, "7");
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_amend_reprices_and_cancels_together() {
        let (ledger, flight, people) = setup(2, 1, random_issuer()).await;
        let booked = ledger.reserve(&request(&people[0], &flight)).await.unwrap();

        let (after, cancelled) = ledger.amend(booked.booking.id, Some(2500), true).await.unwrap();
        assert!(cancelled);
        assert_eq!(after.price_cents, 2500);
        assert_eq!(after.status, BookingStatus::Cancelled);
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 0);

        let (again, cancelled) = ledger.amend(booked.booking.id, None, true).await.unwrap();
        assert!(!cancelled);
        assert_eq!(again.cancelled_at, after.cancelled_at);

        assert!(matches!(
            ledger.amend(4242, Some(1), true).await,
            Err(BookingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_flight_and_passenger() {
        let (ledger, flight, people) = setup(2, 1, random_issuer()).await;

        let mut no_flight = request(&people[0], &flight);
        no_flight.flight_id = 4242;
        assert!(matches!(
            ledger.reserve(&no_flight).await,
            Err(BookingError::NotFound { entity: "flight", .. })
        ));

        let mut no_passenger = request(&people[0], &flight);
        no_passenger.passenger_id = 4242;
        assert!(matches!(
            ledger.reserve(&no_passenger).await,
            Err(BookingError::NotFound { entity: "passenger", .. })
        ));
    }

    #[tokio::test]
    async fn test_records_amend_and_delete() {
        let (ledger, flight, people) = setup(2, 1, random_issuer()).await;
        let booked = ledger.reserve(&request(&people[0], &flight)).await.unwrap();

        let record = ledger.get_booking(booked.booking.id).await.unwrap().unwrap();
        assert_eq!(record.flight_code, "SL101");
        assert_eq!(record.passenger_name, "Passenger 0");
        assert_eq!(record.ticket_no.as_deref(), Some(booked.ticket.ticket_no.as_str()));
        assert_eq!(record.class, Some(TicketClass::Economy));

        let (repriced, cancelled) = ledger.amend(booked.booking.id, Some(0), false).await.unwrap();
        assert_eq!(repriced.price_cents, 0);
        assert!(!cancelled);
        assert!(matches!(
            ledger.amend(booked.booking.id, Some(-5), true).await,
            Err(BookingError::InvalidPrice(-5))
        ));
        // The rejected amendment cancelled nothing.
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 1);

        ledger.delete_booking(booked.booking.id).await.unwrap();
        assert!(ledger.get_booking(booked.booking.id).await.unwrap().is_none());
        assert_eq!(ledger.occupancy(flight.id).await.unwrap(), 0);
        assert!(matches!(
            ledger.delete_booking(booked.booking.id).await,
            Err(BookingError::NotFound { .. })
        ));
    }
}
