use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use skyledger_core::catalog::{
    Aircraft, Airport, CrewAssignment, CrewMember, Flight, NewAircraft, NewAirport,
    NewCrewAssignment, NewCrewMember, NewFlight, NewPassenger, Passenger,
};
use skyledger_core::repository::CatalogReader;
use skyledger_core::{BookingError, BookingResult, Masked};

use crate::error::{storage, write_error};

const FLIGHT_SELECT: &str = r#"
    SELECT f.id, f.code, o.code AS origin, d.code AS destination,
           f.departure_time, f.arrival_time,
           a.id AS aircraft_id, a.model AS aircraft_model, a.capacity,
           f.base_price_cents
    FROM flight f
    JOIN airport o ON o.id = f.departure_airport_id
    JOIN airport d ON d.id = f.arrival_airport_id
    JOIN aircraft a ON a.id = f.aircraft_id
"#;

const ASSIGNMENT_SELECT: &str = r#"
    SELECT ca.id, ca.crew_member_id, cm.name AS crew_member_name,
           ca.flight_id, f.code AS flight_code, ca.duty
    FROM crew_assignment ca
    JOIN crew_member cm ON cm.id = ca.crew_member_id
    JOIN flight f ON f.id = ca.flight_id
"#;

/// Re-point a flight only if the target aircraft can seat everyone already booked.
const FLIGHT_UPDATE: &str = r#"
    UPDATE flight
    SET code = ?1, departure_airport_id = ?2, arrival_airport_id = ?3,
        departure_time = ?4, arrival_time = ?5, aircraft_id = ?6, base_price_cents = ?7
    WHERE id = ?8
      AND (SELECT capacity FROM aircraft WHERE id = ?6) >= (
          SELECT COUNT(t.id)
          FROM ticket t
          JOIN booking b ON b.id = t.booking_id
          WHERE b.flight_id = ?8 AND b.status = 'BOOKED'
      )
"#;

/// Shrink an aircraft only if no flight flown by it holds more active tickets.
const AIRCRAFT_UPDATE: &str = r#"
    UPDATE aircraft
    SET model = ?1, capacity = ?2
    WHERE id = ?3
      AND ?2 >= COALESCE((
          SELECT MAX(active) FROM (
              SELECT COUNT(t.id) AS active
              FROM ticket t
              JOIN booking b ON b.id = t.booking_id
              JOIN flight f ON f.id = b.flight_id
              WHERE f.aircraft_id = ?3 AND b.status = 'BOOKED'
              GROUP BY b.flight_id
          )
      ), 0)
"#;

#[derive(sqlx::FromRow)]
struct AirportRow {
    id: i64,
    code: String,
    name: String,
    city: String,
    country: String,
}

impl From<AirportRow> for Airport {
    fn from(r: AirportRow) -> Self {
        Airport {
            id: r.id,
            code: r.code,
            name: r.name,
            city: r.city,
            country: r.country,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AircraftRow {
    id: i64,
    model: String,
    capacity: i64,
}

impl From<AircraftRow> for Aircraft {
    fn from(r: AircraftRow) -> Self {
        Aircraft {
            id: r.id,
            model: r.model,
            capacity: r.capacity,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: i64,
    code: String,
    origin: String,
    destination: String,
    departure_time: DateTime<Utc>,
    arrival_time: DateTime<Utc>,
    aircraft_id: i64,
    aircraft_model: String,
    capacity: i64,
    base_price_cents: i64,
}

impl From<FlightRow> for Flight {
    fn from(r: FlightRow) -> Self {
        Flight {
            id: r.id,
            code: r.code,
            origin: r.origin,
            destination: r.destination,
            departure_time: r.departure_time,
            arrival_time: r.arrival_time,
            aircraft_id: r.aircraft_id,
            aircraft_model: r.aircraft_model,
            capacity: r.capacity,
            base_price_cents: r.base_price_cents,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PassengerRow {
    id: i64,
    name: String,
    email: String,
}

impl From<PassengerRow> for Passenger {
    fn from(r: PassengerRow) -> Self {
        Passenger {
            id: r.id,
            name: r.name,
            email: Masked(r.email),
        }
    }
}

#[derive(sqlx::FromRow)]
struct CrewMemberRow {
    id: i64,
    name: String,
    role: String,
}

impl From<CrewMemberRow> for CrewMember {
    fn from(r: CrewMemberRow) -> Self {
        CrewMember {
            id: r.id,
            name: r.name,
            role: r.role,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AssignmentRow {
    id: i64,
    crew_member_id: i64,
    crew_member_name: String,
    flight_id: i64,
    flight_code: String,
    duty: String,
}

impl From<AssignmentRow> for CrewAssignment {
    fn from(r: AssignmentRow) -> Self {
        CrewAssignment {
            id: r.id,
            crew_member_id: r.crew_member_id,
            crew_member_name: r.crew_member_name,
            flight_id: r.flight_id,
            flight_code: r.flight_code,
            duty: r.duty,
        }
    }
}

fn airport_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// SQLite-backed catalog store: everything except bookings and tickets.
///
/// Inputs are expected to be validated by the caller; this layer only enforces what the
/// schema and the capacity invariant require.
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn ensure_deleted(entity: &'static str, id: i64, rows: u64) -> BookingResult<()> {
        if rows == 0 {
            return Err(BookingError::not_found(entity, id));
        }
        info!("Deleted {} {}", entity, id);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Passengers
    // ------------------------------------------------------------------------

    pub async fn create_passenger(&self, input: &NewPassenger) -> BookingResult<Passenger> {
        let id = sqlx::query("INSERT INTO passenger (name, email) VALUES (?, ?)")
            .bind(input.name.trim())
            .bind(email_key(&input.email))
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("passenger with this email", e))?
            .last_insert_rowid();

        info!("Created passenger {}", id);
        self.require_passenger(id).await
    }

    pub async fn get_passenger(&self, id: i64) -> BookingResult<Option<Passenger>> {
        let row = sqlx::query_as::<_, PassengerRow>("SELECT id, name, email FROM passenger WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Passenger::from))
    }

    pub async fn find_passenger_by_email(&self, email: &str) -> BookingResult<Option<Passenger>> {
        let row = sqlx::query_as::<_, PassengerRow>("SELECT id, name, email FROM passenger WHERE email = ?")
            .bind(email_key(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Passenger::from))
    }

    pub async fn list_passengers(&self) -> BookingResult<Vec<Passenger>> {
        let rows = sqlx::query_as::<_, PassengerRow>("SELECT id, name, email FROM passenger ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Passenger::from).collect())
    }

    pub async fn update_passenger(&self, id: i64, input: &NewPassenger) -> BookingResult<Passenger> {
        let updated = sqlx::query("UPDATE passenger SET name = ?, email = ? WHERE id = ?")
            .bind(input.name.trim())
            .bind(email_key(&input.email))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("passenger with this email", e))?
            .rows_affected();
        if updated == 0 {
            return Err(BookingError::not_found("passenger", id));
        }
        self.require_passenger(id).await
    }

    /// Passengers with booking history cannot be deleted.
    pub async fn delete_passenger(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM passenger WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("passenger", e))?
            .rows_affected();
        Self::ensure_deleted("passenger", id, deleted)
    }

    async fn require_passenger(&self, id: i64) -> BookingResult<Passenger> {
        self.get_passenger(id)
            .await?
            .ok_or_else(|| BookingError::not_found("passenger", id))
    }

    // ------------------------------------------------------------------------
    // Airports
    // ------------------------------------------------------------------------

    pub async fn create_airport(&self, input: &NewAirport) -> BookingResult<Airport> {
        let id = sqlx::query("INSERT INTO airport (code, name, city, country) VALUES (?, ?, ?, ?)")
            .bind(airport_code(&input.code))
            .bind(input.name.trim())
            .bind(input.city.trim())
            .bind(input.country.trim())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("airport", e))?
            .last_insert_rowid();

        info!("Created airport {} ({})", airport_code(&input.code), id);
        self.require_airport(id).await
    }

    pub async fn get_airport(&self, id: i64) -> BookingResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>("SELECT id, code, name, city, country FROM airport WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Airport::from))
    }

    pub async fn get_airport_by_code(&self, code: &str) -> BookingResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>("SELECT id, code, name, city, country FROM airport WHERE code = ?")
            .bind(airport_code(code))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Airport::from))
    }

    pub async fn list_airports(&self) -> BookingResult<Vec<Airport>> {
        let rows = sqlx::query_as::<_, AirportRow>("SELECT id, code, name, city, country FROM airport ORDER BY code")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Airport::from).collect())
    }

    pub async fn update_airport(&self, id: i64, input: &NewAirport) -> BookingResult<Airport> {
        let updated = sqlx::query("UPDATE airport SET code = ?, name = ?, city = ?, country = ? WHERE id = ?")
            .bind(airport_code(&input.code))
            .bind(input.name.trim())
            .bind(input.city.trim())
            .bind(input.country.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("airport", e))?
            .rows_affected();
        if updated == 0 {
            return Err(BookingError::not_found("airport", id));
        }
        self.require_airport(id).await
    }

    pub async fn delete_airport(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM airport WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("airport", e))?
            .rows_affected();
        Self::ensure_deleted("airport", id, deleted)
    }

    async fn require_airport(&self, id: i64) -> BookingResult<Airport> {
        self.get_airport(id)
            .await?
            .ok_or_else(|| BookingError::not_found("airport", id))
    }

    async fn airport_id(&self, code: &str) -> BookingResult<i64> {
        self.get_airport_by_code(code)
            .await?
            .map(|a| a.id)
            .ok_or_else(|| BookingError::not_found("airport", airport_code(code)))
    }

    // ------------------------------------------------------------------------
    // Aircraft
    // ------------------------------------------------------------------------

    pub async fn create_aircraft(&self, input: &NewAircraft) -> BookingResult<Aircraft> {
        let id = sqlx::query("INSERT INTO aircraft (model, capacity) VALUES (?, ?)")
            .bind(input.model.trim())
            .bind(input.capacity)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("aircraft", e))?
            .last_insert_rowid();

        info!("Created aircraft {} ({} seats)", id, input.capacity);
        self.require_aircraft(id).await
    }

    pub async fn get_aircraft(&self, id: i64) -> BookingResult<Option<Aircraft>> {
        let row = sqlx::query_as::<_, AircraftRow>("SELECT id, model, capacity FROM aircraft WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Aircraft::from))
    }

    pub async fn list_aircraft(&self) -> BookingResult<Vec<Aircraft>> {
        let rows = sqlx::query_as::<_, AircraftRow>("SELECT id, model, capacity FROM aircraft ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Aircraft::from).collect())
    }

    pub async fn update_aircraft(&self, id: i64, input: &NewAircraft) -> BookingResult<Aircraft> {
        let updated = sqlx::query(AIRCRAFT_UPDATE)
            .bind(input.model.trim())
            .bind(input.capacity)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("aircraft", e))?
            .rows_affected();

        if updated == 0 {
            self.require_aircraft(id).await?;
            warn!("Refused to shrink aircraft {} to {} seats", id, input.capacity);
            return Err(BookingError::Conflict(format!(
                "aircraft {} flies a flight with more than {} active tickets",
                id, input.capacity
            )));
        }
        self.require_aircraft(id).await
    }

    pub async fn delete_aircraft(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM aircraft WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("aircraft", e))?
            .rows_affected();
        Self::ensure_deleted("aircraft", id, deleted)
    }

    async fn require_aircraft(&self, id: i64) -> BookingResult<Aircraft> {
        self.get_aircraft(id)
            .await?
            .ok_or_else(|| BookingError::not_found("aircraft", id))
    }

    // ------------------------------------------------------------------------
    // Flights
    // ------------------------------------------------------------------------

    pub async fn create_flight(&self, input: &NewFlight) -> BookingResult<Flight> {
        let origin = self.airport_id(&input.origin).await?;
        let destination = self.airport_id(&input.destination).await?;
        self.require_aircraft(input.aircraft_id).await?;

        let id = sqlx::query(
            r#"
            INSERT INTO flight (code, departure_airport_id, arrival_airport_id,
                                departure_time, arrival_time, aircraft_id, base_price_cents)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(input.code.trim())
        .bind(origin)
        .bind(destination)
        .bind(input.departure_time)
        .bind(input.arrival_time)
        .bind(input.aircraft_id)
        .bind(input.base_price_cents)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error("flight", e))?
        .last_insert_rowid();

        info!("Created flight {} ({})", input.code.trim(), id);
        self.require_flight(id).await
    }

    pub async fn get_flight(&self, id: i64) -> BookingResult<Option<Flight>> {
        let sql = format!("{} WHERE f.id = ?", FLIGHT_SELECT);
        let row = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Flight::from))
    }

    pub async fn find_flight_by_code(&self, code: &str) -> BookingResult<Option<Flight>> {
        let sql = format!("{} WHERE f.code = ?", FLIGHT_SELECT);
        let row = sqlx::query_as::<_, FlightRow>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(Flight::from))
    }

    pub async fn list_flights(&self) -> BookingResult<Vec<Flight>> {
        let sql = format!("{} ORDER BY f.departure_time, f.id", FLIGHT_SELECT);
        let rows = sqlx::query_as::<_, FlightRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(Flight::from).collect())
    }

    pub async fn update_flight(&self, id: i64, input: &NewFlight) -> BookingResult<Flight> {
        let origin = self.airport_id(&input.origin).await?;
        let destination = self.airport_id(&input.destination).await?;
        let aircraft = self.require_aircraft(input.aircraft_id).await?;

        let updated = sqlx::query(FLIGHT_UPDATE)
            .bind(input.code.trim())
            .bind(origin)
            .bind(destination)
            .bind(input.departure_time)
            .bind(input.arrival_time)
            .bind(input.aircraft_id)
            .bind(input.base_price_cents)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("flight", e))?
            .rows_affected();

        if updated == 0 {
            self.require_flight(id).await?;
            warn!(
                "Refused to move flight {} onto aircraft {} ({} seats)",
                id, aircraft.id, aircraft.capacity
            );
            return Err(BookingError::Conflict(format!(
                "flight {} holds more active tickets than aircraft {} can seat ({})",
                id, aircraft.id, aircraft.capacity
            )));
        }
        self.require_flight(id).await
    }

    /// Flights with bookings cannot be deleted; crew assignments go with the flight.
    pub async fn delete_flight(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM flight WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("flight", e))?
            .rows_affected();
        Self::ensure_deleted("flight", id, deleted)
    }

    async fn require_flight(&self, id: i64) -> BookingResult<Flight> {
        self.get_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", id))
    }

    // ------------------------------------------------------------------------
    // Crew
    // ------------------------------------------------------------------------

    pub async fn create_crew_member(&self, input: &NewCrewMember) -> BookingResult<CrewMember> {
        let id = sqlx::query("INSERT INTO crew_member (name, role) VALUES (?, ?)")
            .bind(input.name.trim())
            .bind(input.role.trim())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("crew member", e))?
            .last_insert_rowid();
        self.require_crew_member(id).await
    }

    pub async fn get_crew_member(&self, id: i64) -> BookingResult<Option<CrewMember>> {
        let row = sqlx::query_as::<_, CrewMemberRow>("SELECT id, name, role FROM crew_member WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(CrewMember::from))
    }

    pub async fn list_crew_members(&self) -> BookingResult<Vec<CrewMember>> {
        let rows = sqlx::query_as::<_, CrewMemberRow>("SELECT id, name, role FROM crew_member ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(CrewMember::from).collect())
    }

    pub async fn update_crew_member(&self, id: i64, input: &NewCrewMember) -> BookingResult<CrewMember> {
        let updated = sqlx::query("UPDATE crew_member SET name = ?, role = ? WHERE id = ?")
            .bind(input.name.trim())
            .bind(input.role.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("crew member", e))?
            .rows_affected();
        if updated == 0 {
            return Err(BookingError::not_found("crew member", id));
        }
        self.require_crew_member(id).await
    }

    pub async fn delete_crew_member(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM crew_member WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("crew member", e))?
            .rows_affected();
        Self::ensure_deleted("crew member", id, deleted)
    }

    async fn require_crew_member(&self, id: i64) -> BookingResult<CrewMember> {
        self.get_crew_member(id)
            .await?
            .ok_or_else(|| BookingError::not_found("crew member", id))
    }

    pub async fn create_assignment(&self, input: &NewCrewAssignment) -> BookingResult<CrewAssignment> {
        self.require_crew_member(input.crew_member_id).await?;
        self.require_flight(input.flight_id).await?;

        let id = sqlx::query("INSERT INTO crew_assignment (crew_member_id, flight_id, duty) VALUES (?, ?, ?)")
            .bind(input.crew_member_id)
            .bind(input.flight_id)
            .bind(input.duty.trim())
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("crew assignment for this flight", e))?
            .last_insert_rowid();

        info!(
            "Assigned crew member {} to flight {} as {}",
            input.crew_member_id, input.flight_id, input.duty
        );
        self.require_assignment(id).await
    }

    pub async fn get_assignment(&self, id: i64) -> BookingResult<Option<CrewAssignment>> {
        let sql = format!("{} WHERE ca.id = ?", ASSIGNMENT_SELECT);
        let row = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        Ok(row.map(CrewAssignment::from))
    }

    /// All assignments, or only those on `flight_id`.
    pub async fn list_assignments(&self, flight_id: Option<i64>) -> BookingResult<Vec<CrewAssignment>> {
        let sql = format!(
            "{} WHERE (?1 IS NULL OR ca.flight_id = ?1) ORDER BY ca.flight_id, ca.id",
            ASSIGNMENT_SELECT
        );
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(flight_id)
            .fetch_all(&self.pool)
            .await
            .map_err(storage)?;
        Ok(rows.into_iter().map(CrewAssignment::from).collect())
    }

    pub async fn update_assignment(&self, id: i64, input: &NewCrewAssignment) -> BookingResult<CrewAssignment> {
        self.require_crew_member(input.crew_member_id).await?;
        self.require_flight(input.flight_id).await?;

        let updated = sqlx::query("UPDATE crew_assignment SET crew_member_id = ?, flight_id = ?, duty = ? WHERE id = ?")
            .bind(input.crew_member_id)
            .bind(input.flight_id)
            .bind(input.duty.trim())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("crew assignment for this flight", e))?
            .rows_affected();
        if updated == 0 {
            return Err(BookingError::not_found("crew assignment", id));
        }
        self.require_assignment(id).await
    }

    pub async fn delete_assignment(&self, id: i64) -> BookingResult<()> {
        let deleted = sqlx::query("DELETE FROM crew_assignment WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| write_error("crew assignment", e))?
            .rows_affected();
        Self::ensure_deleted("crew assignment", id, deleted)
    }

    async fn require_assignment(&self, id: i64) -> BookingResult<CrewAssignment> {
        self.get_assignment(id)
            .await?
            .ok_or_else(|| BookingError::not_found("crew assignment", id))
    }
}

#[async_trait]
impl CatalogReader for SqliteCatalog {
    async fn get_flight(&self, id: i64) -> BookingResult<Option<Flight>> {
        SqliteCatalog::get_flight(self, id).await
    }

    async fn get_passenger(&self, id: i64) -> BookingResult<Option<Passenger>> {
        SqliteCatalog::get_passenger(self, id).await
    }
}
