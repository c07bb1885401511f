//! Catalog records owned by the catalog store: airports, aircraft, flights, passengers,
//! crew and user accounts.
//!
//! Each record comes with a `New*` input type and a `*Patch` partial update. A patch
//! field left as `None` keeps the stored value; `Some` always overwrites it, including
//! zero prices. Patches are merged onto the current row and the merged result goes
//! through the same validation as a fresh insert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::error::{BookingError, BookingResult};
use crate::pii::Masked;

fn require_text(field: &str, value: &str) -> BookingResult<()> {
    if value.trim().is_empty() {
        return Err(BookingError::validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

// ============================================================================
// Airports
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAirport {
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
}

impl NewAirport {
    pub fn validate(&self) -> BookingResult<()> {
        require_text("airport code", &self.code)?;
        require_text("airport name", &self.name)?;
        require_text("city", &self.city)?;
        require_text("country", &self.country)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AirportPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
}

impl AirportPatch {
    pub fn merge(self, current: &Airport) -> NewAirport {
        NewAirport {
            code: self.code.unwrap_or_else(|| current.code.clone()),
            name: self.name.unwrap_or_else(|| current.name.clone()),
            city: self.city.unwrap_or_else(|| current.city.clone()),
            country: self.country.unwrap_or_else(|| current.country.clone()),
        }
    }
}

// ============================================================================
// Aircraft
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Aircraft {
    pub id: i64,
    pub model: String,
    pub capacity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAircraft {
    pub model: String,
    pub capacity: i64,
}

impl NewAircraft {
    pub fn validate(&self) -> BookingResult<()> {
        require_text("aircraft model", &self.model)?;
        if self.capacity <= 0 {
            return Err(BookingError::validation(format!(
                "aircraft capacity must be positive (got {})",
                self.capacity
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AircraftPatch {
    pub model: Option<String>,
    pub capacity: Option<i64>,
}

impl AircraftPatch {
    pub fn merge(self, current: &Aircraft) -> NewAircraft {
        NewAircraft {
            model: self.model.unwrap_or_else(|| current.model.clone()),
            capacity: self.capacity.unwrap_or(current.capacity),
        }
    }
}

// ============================================================================
// Flights
// ============================================================================

/// A scheduled flight joined with its route and aircraft. `capacity` is read from the
/// aircraft and is the hard ceiling on active tickets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flight {
    pub id: i64,
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub aircraft_id: i64,
    pub aircraft_model: String,
    pub capacity: i64,
    pub base_price_cents: i64,
}

/// Flight input. `origin` and `destination` are airport codes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewFlight {
    pub code: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub aircraft_id: i64,
    pub base_price_cents: i64,
}

impl NewFlight {
    pub fn validate(&self, now: DateTime<Utc>) -> BookingResult<()> {
        require_text("flight code", &self.code)?;
        require_text("origin", &self.origin)?;
        require_text("destination", &self.destination)?;
        if self.origin.eq_ignore_ascii_case(&self.destination) {
            return Err(BookingError::validation("origin and destination must differ"));
        }
        if self.base_price_cents < 0 {
            return Err(BookingError::InvalidPrice(self.base_price_cents));
        }
        if self.departure_time <= now {
            return Err(BookingError::InvalidSchedule(format!(
                "departure {} is not in the future",
                self.departure_time.to_rfc3339()
            )));
        }
        if self.arrival_time <= self.departure_time {
            return Err(BookingError::InvalidSchedule(
                "arrival must be after departure".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightPatch {
    pub code: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub aircraft_id: Option<i64>,
    pub base_price_cents: Option<i64>,
}

impl FlightPatch {
    pub fn merge(self, current: &Flight) -> NewFlight {
        NewFlight {
            code: self.code.unwrap_or_else(|| current.code.clone()),
            origin: self.origin.unwrap_or_else(|| current.origin.clone()),
            destination: self.destination.unwrap_or_else(|| current.destination.clone()),
            departure_time: self.departure_time.unwrap_or(current.departure_time),
            arrival_time: self.arrival_time.unwrap_or(current.arrival_time),
            aircraft_id: self.aircraft_id.unwrap_or(current.aircraft_id),
            base_price_cents: self.base_price_cents.unwrap_or(current.base_price_cents),
        }
    }
}

// ============================================================================
// Passengers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Passenger {
    pub id: i64,
    pub name: String,
    pub email: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPassenger {
    pub name: String,
    pub email: String,
}

impl NewPassenger {
    pub fn validate(&self) -> BookingResult<()> {
        require_text("passenger name", &self.name)?;
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(BookingError::validation("email must look like name@domain")),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PassengerPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl PassengerPatch {
    pub fn merge(self, current: &Passenger) -> NewPassenger {
        NewPassenger {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            email: self.email.unwrap_or_else(|| current.email.expose().clone()),
        }
    }
}

// ============================================================================
// Crew
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCrewMember {
    pub name: String,
    pub role: String,
}

impl NewCrewMember {
    pub fn validate(&self) -> BookingResult<()> {
        require_text("crew member name", &self.name)?;
        require_text("crew role", &self.role)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrewMemberPatch {
    pub name: Option<String>,
    pub role: Option<String>,
}

impl CrewMemberPatch {
    pub fn merge(self, current: &CrewMember) -> NewCrewMember {
        NewCrewMember {
            name: self.name.unwrap_or_else(|| current.name.clone()),
            role: self.role.unwrap_or_else(|| current.role.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewAssignment {
    pub id: i64,
    pub crew_member_id: i64,
    pub crew_member_name: String,
    pub flight_id: i64,
    pub flight_code: String,
    pub duty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewCrewAssignment {
    pub crew_member_id: i64,
    pub flight_id: i64,
    pub duty: String,
}

impl NewCrewAssignment {
    pub fn validate(&self) -> BookingResult<()> {
        require_text("duty", &self.duty)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrewAssignmentPatch {
    pub crew_member_id: Option<i64>,
    pub flight_id: Option<i64>,
    pub duty: Option<String>,
}

impl CrewAssignmentPatch {
    pub fn merge(self, current: &CrewAssignment) -> NewCrewAssignment {
        NewCrewAssignment {
            crew_member_id: self.crew_member_id.unwrap_or(current.crew_member_id),
            flight_id: self.flight_id.unwrap_or(current.flight_id),
            duty: self.duty.unwrap_or_else(|| current.duty.clone()),
        }
    }
}

// ============================================================================
// User accounts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserAccount {
    pub id: i64,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing)]
    pub password_hash: Masked<String>,
    #[serde(skip_serializing)]
    pub salt: String,
}

/// A user row ready to be stored; the password has already been hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: Masked<String>,
    pub salt: String,
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn flight_input(now: DateTime<Utc>) -> NewFlight {
        NewFlight {
            code: "SL101".into(),
            origin: "LHR".into(),
            destination: "DXB".into(),
            departure_time: now + Duration::days(3),
            arrival_time: now + Duration::days(3) + Duration::hours(7),
            aircraft_id: 1,
            base_price_cents: 19950,
        }
    }

    #[test]
    fn test_flight_validation() {
        let now = Utc::now();
        assert!(flight_input(now).validate(now).is_ok());

        let mut past = flight_input(now);
        past.departure_time = now - Duration::hours(1);
        assert!(matches!(past.validate(now), Err(BookingError::InvalidSchedule(_))));

        let mut backwards = flight_input(now);
        backwards.arrival_time = backwards.departure_time;
        assert!(matches!(backwards.validate(now), Err(BookingError::InvalidSchedule(_))));

        let mut negative = flight_input(now);
        negative.base_price_cents = -1;
        assert!(matches!(negative.validate(now), Err(BookingError::InvalidPrice(-1))));

        let mut loop_route = flight_input(now);
        loop_route.destination = "lhr".into();
        assert!(matches!(loop_route.validate(now), Err(BookingError::Validation(_))));
    }

    #[test]
    fn test_patch_keeps_zero_price() {
        let now = Utc::now();
        let input = flight_input(now);
        let current = Flight {
            id: 9,
            code: input.code.clone(),
            origin: input.origin.clone(),
            destination: input.destination.clone(),
            departure_time: input.departure_time,
            arrival_time: input.arrival_time,
            aircraft_id: 1,
            aircraft_model: "Airbus A320".into(),
            capacity: 180,
            base_price_cents: 19950,
        };

        let merged = FlightPatch {
            base_price_cents: Some(0),
            ..Default::default()
        }
        .merge(&current);
        assert_eq!(merged.base_price_cents, 0);
        assert_eq!(merged.code, "SL101");

        let untouched = FlightPatch::default().merge(&current);
        assert_eq!(untouched.base_price_cents, 19950);
    }

    #[test]
    fn test_empty_strings_are_rejected_not_ignored() {
        let current = Passenger {
            id: 1,
            name: "Sara Malik".into(),
            email: Masked("sara@example.com".into()),
        };
        let merged = PassengerPatch {
            name: Some("".into()),
            email: None,
        }
        .merge(&current);
        assert!(matches!(merged.validate(), Err(BookingError::Validation(_))));
    }

    #[test]
    fn test_aircraft_capacity_must_be_positive() {
        let aircraft = NewAircraft { model: "ATR 72".into(), capacity: 0 };
        assert!(aircraft.validate().is_err());
        let aircraft = NewAircraft { model: "ATR 72".into(), capacity: 70 };
        assert!(aircraft.validate().is_ok());
    }
}
