use async_trait::async_trait;
use sqlx::SqlitePool;

use skyledger_core::report::{FlightLoad, FlightRevenue, MonthlyRevenue, RouteVolume};
use skyledger_core::repository::ReportRepository;
use skyledger_core::BookingResult;

use crate::error::storage;

#[derive(sqlx::FromRow)]
struct RouteRow {
    origin: String,
    destination: String,
    bookings: i64,
}

#[derive(sqlx::FromRow)]
struct MonthRow {
    month: String,
    revenue_cents: i64,
}

#[derive(sqlx::FromRow)]
struct LoadRow {
    flight_code: String,
    active_tickets: i64,
    capacity: i64,
}

#[derive(sqlx::FromRow)]
struct FlightRevenueRow {
    flight_code: String,
    revenue_cents: i64,
}

/// Read-only aggregations. Only active (BOOKED) bookings count towards volume and revenue.
pub struct SqliteReports {
    pool: SqlitePool,
}

impl SqliteReports {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportRepository for SqliteReports {
    async fn top_routes(&self, limit: i64) -> BookingResult<Vec<RouteVolume>> {
        let rows = sqlx::query_as::<_, RouteRow>(
            r#"
            SELECT o.code AS origin, d.code AS destination, COUNT(b.id) AS bookings
            FROM booking b
            JOIN flight f ON f.id = b.flight_id
            JOIN airport o ON o.id = f.departure_airport_id
            JOIN airport d ON d.id = f.arrival_airport_id
            WHERE b.status = 'BOOKED'
            GROUP BY o.code, d.code
            ORDER BY bookings DESC, o.code, d.code
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|r| RouteVolume {
                origin: r.origin,
                destination: r.destination,
                bookings: r.bookings,
            })
            .collect())
    }

    async fn revenue_by_month(&self) -> BookingResult<Vec<MonthlyRevenue>> {
        // booked_at is RFC 3339 text, so its first seven characters are YYYY-MM.
        let rows = sqlx::query_as::<_, MonthRow>(
            r#"
            SELECT substr(b.booked_at, 1, 7) AS month, SUM(b.price_cents) AS revenue_cents
            FROM booking b
            WHERE b.status = 'BOOKED'
            GROUP BY month
            ORDER BY month
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|r| MonthlyRevenue {
                month: r.month,
                revenue_cents: r.revenue_cents,
            })
            .collect())
    }

    async fn load_factor(&self) -> BookingResult<Vec<FlightLoad>> {
        let rows = sqlx::query_as::<_, LoadRow>(
            r#"
            SELECT f.code AS flight_code, COUNT(t.id) AS active_tickets, a.capacity
            FROM flight f
            JOIN aircraft a ON a.id = f.aircraft_id
            LEFT JOIN booking b ON b.flight_id = f.id AND b.status = 'BOOKED'
            LEFT JOIN ticket t ON t.booking_id = b.id
            GROUP BY f.id, f.code, a.capacity
            ORDER BY f.departure_time, f.id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|r| FlightLoad {
                load_factor: r.active_tickets as f64 / r.capacity as f64,
                flight_code: r.flight_code,
                active_tickets: r.active_tickets,
                capacity: r.capacity,
            })
            .collect())
    }

    async fn revenue_by_flight(&self) -> BookingResult<Vec<FlightRevenue>> {
        let rows = sqlx::query_as::<_, FlightRevenueRow>(
            r#"
            SELECT f.code AS flight_code, COALESCE(SUM(b.price_cents), 0) AS revenue_cents
            FROM flight f
            LEFT JOIN booking b ON b.flight_id = f.id AND b.status = 'BOOKED'
            GROUP BY f.id, f.code
            ORDER BY revenue_cents DESC, f.code
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Ok(rows
            .into_iter()
            .map(|r| FlightRevenue {
                flight_code: r.flight_code,
                revenue_cents: r.revenue_cents,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_repo::SqliteCatalog;
    use crate::database::DbClient;
    use crate::ledger_repo::SqliteLedger;
    use chrono::{Duration, Utc};
    use skyledger_core::catalog::{NewAircraft, NewAirport, NewFlight, NewPassenger};
    use skyledger_core::repository::InventoryLedger;
    use skyledger_core::{RandomTicketIssuer, ReserveRequest, TicketClass};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_reports_count_only_active_bookings() {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let catalog = SqliteCatalog::new(db.pool.clone());
        let ledger = SqliteLedger::new(db.pool.clone(), Arc::new(RandomTicketIssuer::seeded("SL", 3)), 5);
        let reports = SqliteReports::new(db.pool.clone());

        for code in ["LHR", "DXB", "ISB"] {
            catalog
                .create_airport(&NewAirport {
                    code: code.into(),
                    name: code.into(),
                    city: code.into(),
                    country: "XX".into(),
                })
                .await
                .unwrap();
        }
        let aircraft = catalog
            .create_aircraft(&NewAircraft { model: "Test Jet".into(), capacity: 4 })
            .await
            .unwrap();
        let departure = Utc::now() + Duration::days(4);
        let mut flights = Vec::new();
        for (code, destination) in [("SL1", "DXB"), ("SL2", "ISB")] {
            flights.push(
                catalog
                    .create_flight(&NewFlight {
                        code: code.into(),
                        origin: "LHR".into(),
                        destination: destination.into(),
                        departure_time: departure,
                        arrival_time: departure + Duration::hours(6),
                        aircraft_id: aircraft.id,
                        base_price_cents: 10000,
                    })
                    .await
                    .unwrap(),
            );
        }

        let mut booking_ids = Vec::new();
        for i in 0..3 {
            let passenger = catalog
                .create_passenger(&NewPassenger {
                    name: format!("P{}", i),
                    email: format!("p{}@example.com", i),
                })
                .await
                .unwrap();
            // Two on SL1, one on SL2.
            let flight = if i < 2 { &flights[0] } else { &flights[1] };
            let reservation = ledger
                .reserve(&ReserveRequest {
                    passenger_id: passenger.id,
                    flight_id: flight.id,
                    price_cents: 10000 * (i + 1),
                    class: TicketClass::Economy,
                    seat_no: None,
                })
                .await
                .unwrap();
            booking_ids.push(reservation.booking.id);
        }
        // Cancelled revenue drops out.
        ledger.cancel(booking_ids[1]).await.unwrap();

        let routes = reports.top_routes(5).await.unwrap();
        assert_eq!(routes.len(), 2);
        assert!(routes.iter().all(|r| r.bookings == 1));
        assert_eq!(reports.top_routes(1).await.unwrap().len(), 1);

        let by_flight = reports.revenue_by_flight().await.unwrap();
        assert_eq!(by_flight[0].flight_code, "SL2");
        assert_eq!(by_flight[0].revenue_cents, 30000);
        assert_eq!(by_flight[1].revenue_cents, 10000);

        let months = reports.revenue_by_month().await.unwrap();
        assert_eq!(months.len(), 1);
        assert_eq!(months[0].month, Utc::now().format("%Y-%m").to_string());
        assert_eq!(months[0].revenue_cents, 40000);

        let loads = reports.load_factor().await.unwrap();
        let sl1 = loads.iter().find(|l| l.flight_code == "SL1").unwrap();
        assert_eq!(sl1.active_tickets, 1);
        assert_eq!(sl1.capacity, 4);
        assert!((sl1.load_factor - 0.25).abs() < f64::EPSILON);
    }
}
