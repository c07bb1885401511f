use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::info;

use skyledger_core::BookingResult;

use crate::error::storage;

const AIRPORTS: [(&str, &str, &str, &str); 3] = [
    ("LHR", "Heathrow", "London", "UK"),
    ("DXB", "Dubai Intl", "Dubai", "UAE"),
    ("ISB", "Islamabad Intl", "Islamabad", "Pakistan"),
];

const AIRCRAFT: [(&str, i64); 2] = [("Airbus A320", 180), ("Boeing 777-300ER", 396)];

const PASSENGERS: [(&str, &str); 2] = [
    ("Adnan Khan", "adnan@example.com"),
    ("Sara Malik", "sara@example.com"),
];

/// Rows actually inserted; rerunning the seed inserts nothing.
#[derive(Debug, Default, Clone, Serialize, PartialEq, Eq)]
pub struct SeedSummary {
    pub airports: u64,
    pub aircraft: u64,
    pub passengers: u64,
    pub flights: u64,
}

/// Departure of the demo flight: 08:30 UTC two weeks after `now`.
pub fn demo_departure(now: DateTime<Utc>) -> DateTime<Utc> {
    let day = (now + Duration::days(14)).date_naive();
    let at = NaiveTime::from_hms_opt(8, 30, 0).unwrap_or(NaiveTime::MIN);
    day.and_time(at).and_utc()
}

/// Insert demo airports, aircraft, passengers and flight SL101 (LHR to DXB).
pub async fn seed_demo(pool: &SqlitePool) -> BookingResult<SeedSummary> {
    let mut summary = SeedSummary::default();
    let mut tx = pool.begin().await.map_err(storage)?;

    for (code, name, city, country) in AIRPORTS {
        summary.airports += sqlx::query("INSERT OR IGNORE INTO airport (code, name, city, country) VALUES (?, ?, ?, ?)")
            .bind(code)
            .bind(name)
            .bind(city)
            .bind(country)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();
    }

    for (model, capacity) in AIRCRAFT {
        summary.aircraft += sqlx::query("INSERT OR IGNORE INTO aircraft (model, capacity) VALUES (?, ?)")
            .bind(model)
            .bind(capacity)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();
    }

    for (name, email) in PASSENGERS {
        summary.passengers += sqlx::query("INSERT OR IGNORE INTO passenger (name, email) VALUES (?, ?)")
            .bind(name)
            .bind(email)
            .execute(&mut *tx)
            .await
            .map_err(storage)?
            .rows_affected();
    }

    let departure = demo_departure(Utc::now());
    let arrival = departure + Duration::minutes(570);
    summary.flights += sqlx::query(
        r#"
        INSERT OR IGNORE INTO flight
            (code, departure_airport_id, arrival_airport_id,
             departure_time, arrival_time, aircraft_id, base_price_cents)
        SELECT 'SL101',
               (SELECT id FROM airport WHERE code = 'LHR'),
               (SELECT id FROM airport WHERE code = 'DXB'),
               ?, ?,
               (SELECT id FROM aircraft WHERE model = 'Airbus A320' AND capacity = 180),
               19950
        "#,
    )
    .bind(departure)
    .bind(arrival)
    .execute(&mut *tx)
    .await
    .map_err(storage)?
    .rows_affected();

    tx.commit().await.map_err(storage)?;
    info!(
        "Demo data seeded: {} airports, {} aircraft, {} passengers, {} flights",
        summary.airports, summary.aircraft, summary.passengers, summary.flights
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_repo::SqliteCatalog;
    use crate::database::DbClient;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();

        let first = seed_demo(&db.pool).await.unwrap();
        assert_eq!(first.airports, 3);
        assert_eq!(first.flights, 1);

        let second = seed_demo(&db.pool).await.unwrap();
        assert_eq!(second, SeedSummary::default());

        let catalog = SqliteCatalog::new(db.pool.clone());
        let flight = catalog.find_flight_by_code("SL101").await.unwrap().unwrap();
        assert_eq!(flight.origin, "LHR");
        assert_eq!(flight.destination, "DXB");
        assert_eq!(flight.capacity, 180);
        assert_eq!(flight.base_price_cents, 19950);
        assert!(flight.departure_time > Utc::now());
    }
}
