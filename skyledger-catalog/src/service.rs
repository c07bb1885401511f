use chrono::Utc;

use skyledger_core::access::require;
use skyledger_core::catalog::{
    Aircraft, AircraftPatch, Airport, AirportPatch, CrewAssignment, CrewAssignmentPatch,
    CrewMember, CrewMemberPatch, Flight, FlightPatch, NewAircraft, NewAirport,
    NewCrewAssignment, NewCrewMember, NewFlight, NewPassenger, Passenger, PassengerPatch,
};
use skyledger_core::{BookingError, BookingResult, Operation, Role};
use skyledger_store::SqliteCatalog;

/// Role-gated catalog management. Every method authorizes first, validates second and
/// only then touches storage.
#[derive(Clone)]
pub struct CatalogService {
    store: SqliteCatalog,
}

impl CatalogService {
    pub fn new(store: SqliteCatalog) -> Self {
        Self { store }
    }

    // ------------------------------------------------------------------------
    // Passengers
    // ------------------------------------------------------------------------

    pub async fn add_passenger(&self, role: Option<Role>, input: NewPassenger) -> BookingResult<Passenger> {
        require(role, Operation::AddPassenger)?;
        input.validate()?;
        self.store.create_passenger(&input).await
    }

    pub async fn get_passenger(&self, role: Option<Role>, id: i64) -> BookingResult<Passenger> {
        require(role, Operation::LookupPassenger)?;
        self.store
            .get_passenger(id)
            .await?
            .ok_or_else(|| BookingError::not_found("passenger", id))
    }

    pub async fn find_passenger_by_email(&self, role: Option<Role>, email: &str) -> BookingResult<Passenger> {
        require(role, Operation::LookupPassenger)?;
        self.store
            .find_passenger_by_email(email)
            .await?
            .ok_or_else(|| BookingError::not_found("passenger", email.trim()))
    }

    pub async fn list_passengers(&self, role: Option<Role>) -> BookingResult<Vec<Passenger>> {
        require(role, Operation::ListPassengers)?;
        self.store.list_passengers().await
    }

    pub async fn update_passenger(
        &self,
        role: Option<Role>,
        id: i64,
        patch: PassengerPatch,
    ) -> BookingResult<Passenger> {
        require(role, Operation::UpdatePassenger)?;
        let current = self
            .store
            .get_passenger(id)
            .await?
            .ok_or_else(|| BookingError::not_found("passenger", id))?;
        let merged = patch.merge(&current);
        merged.validate()?;
        self.store.update_passenger(id, &merged).await
    }

    pub async fn delete_passenger(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeletePassenger)?;
        self.store.delete_passenger(id).await
    }

    // ------------------------------------------------------------------------
    // Airports
    // ------------------------------------------------------------------------

    pub async fn add_airport(&self, role: Option<Role>, input: NewAirport) -> BookingResult<Airport> {
        require(role, Operation::AddAirport)?;
        input.validate()?;
        self.store.create_airport(&input).await
    }

    pub async fn get_airport(&self, role: Option<Role>, id: i64) -> BookingResult<Airport> {
        require(role, Operation::ViewCatalog)?;
        self.store
            .get_airport(id)
            .await?
            .ok_or_else(|| BookingError::not_found("airport", id))
    }

    pub async fn list_airports(&self, role: Option<Role>) -> BookingResult<Vec<Airport>> {
        require(role, Operation::ViewCatalog)?;
        self.store.list_airports().await
    }

    pub async fn update_airport(&self, role: Option<Role>, id: i64, patch: AirportPatch) -> BookingResult<Airport> {
        require(role, Operation::UpdateAirport)?;
        let current = self
            .store
            .get_airport(id)
            .await?
            .ok_or_else(|| BookingError::not_found("airport", id))?;
        let merged = patch.merge(&current);
        merged.validate()?;
        self.store.update_airport(id, &merged).await
    }

    pub async fn delete_airport(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteAirport)?;
        self.store.delete_airport(id).await
    }

    // ------------------------------------------------------------------------
    // Aircraft
    // ------------------------------------------------------------------------

    pub async fn add_aircraft(&self, role: Option<Role>, input: NewAircraft) -> BookingResult<Aircraft> {
        require(role, Operation::AddAircraft)?;
        input.validate()?;
        self.store.create_aircraft(&input).await
    }

    pub async fn get_aircraft(&self, role: Option<Role>, id: i64) -> BookingResult<Aircraft> {
        require(role, Operation::ViewCatalog)?;
        self.store
            .get_aircraft(id)
            .await?
            .ok_or_else(|| BookingError::not_found("aircraft", id))
    }

    pub async fn list_aircraft(&self, role: Option<Role>) -> BookingResult<Vec<Aircraft>> {
        require(role, Operation::ViewCatalog)?;
        self.store.list_aircraft().await
    }

    /// Capacity may only shrink down to the busiest flight's active tickets.
    pub async fn update_aircraft(&self, role: Option<Role>, id: i64, patch: AircraftPatch) -> BookingResult<Aircraft> {
        require(role, Operation::UpdateAircraft)?;
        let current = self
            .store
            .get_aircraft(id)
            .await?
            .ok_or_else(|| BookingError::not_found("aircraft", id))?;
        let merged = patch.merge(&current);
        merged.validate()?;
        self.store.update_aircraft(id, &merged).await
    }

    pub async fn delete_aircraft(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteAircraft)?;
        self.store.delete_aircraft(id).await
    }

    // ------------------------------------------------------------------------
    // Flights
    // ------------------------------------------------------------------------

    pub async fn add_flight(&self, role: Option<Role>, input: NewFlight) -> BookingResult<Flight> {
        require(role, Operation::AddFlight)?;
        input.validate(Utc::now())?;
        self.store.create_flight(&input).await
    }

    pub async fn get_flight(&self, role: Option<Role>, id: i64) -> BookingResult<Flight> {
        require(role, Operation::ViewCatalog)?;
        self.store
            .get_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", id))
    }

    pub async fn find_flight_by_code(&self, role: Option<Role>, code: &str) -> BookingResult<Flight> {
        require(role, Operation::ViewCatalog)?;
        self.store
            .find_flight_by_code(code)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", code.trim()))
    }

    pub async fn list_flights(&self, role: Option<Role>) -> BookingResult<Vec<Flight>> {
        require(role, Operation::ViewCatalog)?;
        self.store.list_flights().await
    }

    pub async fn update_flight(&self, role: Option<Role>, id: i64, patch: FlightPatch) -> BookingResult<Flight> {
        require(role, Operation::UpdateFlight)?;
        let current = self
            .store
            .get_flight(id)
            .await?
            .ok_or_else(|| BookingError::not_found("flight", id))?;
        let merged = patch.merge(&current);
        merged.validate(Utc::now())?;
        self.store.update_flight(id, &merged).await
    }

    pub async fn delete_flight(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteFlight)?;
        self.store.delete_flight(id).await
    }

    // ------------------------------------------------------------------------
    // Crew
    // ------------------------------------------------------------------------

    pub async fn add_crew_member(&self, role: Option<Role>, input: NewCrewMember) -> BookingResult<CrewMember> {
        require(role, Operation::AddCrew)?;
        input.validate()?;
        self.store.create_crew_member(&input).await
    }

    pub async fn get_crew_member(&self, role: Option<Role>, id: i64) -> BookingResult<CrewMember> {
        require(role, Operation::ViewCrew)?;
        self.store
            .get_crew_member(id)
            .await?
            .ok_or_else(|| BookingError::not_found("crew member", id))
    }

    pub async fn list_crew_members(&self, role: Option<Role>) -> BookingResult<Vec<CrewMember>> {
        require(role, Operation::ViewCrew)?;
        self.store.list_crew_members().await
    }

    pub async fn update_crew_member(
        &self,
        role: Option<Role>,
        id: i64,
        patch: CrewMemberPatch,
    ) -> BookingResult<CrewMember> {
        require(role, Operation::UpdateCrew)?;
        let current = self
            .store
            .get_crew_member(id)
            .await?
            .ok_or_else(|| BookingError::not_found("crew member", id))?;
        let merged = patch.merge(&current);
        merged.validate()?;
        self.store.update_crew_member(id, &merged).await
    }

    pub async fn delete_crew_member(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteCrew)?;
        self.store.delete_crew_member(id).await
    }

    pub async fn assign_crew(&self, role: Option<Role>, input: NewCrewAssignment) -> BookingResult<CrewAssignment> {
        require(role, Operation::AssignCrew)?;
        input.validate()?;
        self.store.create_assignment(&input).await
    }

    pub async fn list_assignments(
        &self,
        role: Option<Role>,
        flight_id: Option<i64>,
    ) -> BookingResult<Vec<CrewAssignment>> {
        require(role, Operation::ViewCrew)?;
        self.store.list_assignments(flight_id).await
    }

    pub async fn update_assignment(
        &self,
        role: Option<Role>,
        id: i64,
        patch: CrewAssignmentPatch,
    ) -> BookingResult<CrewAssignment> {
        require(role, Operation::UpdateCrewAssignment)?;
        let current = self
            .store
            .get_assignment(id)
            .await?
            .ok_or_else(|| BookingError::not_found("crew assignment", id))?;
        let merged = patch.merge(&current);
        merged.validate()?;
        self.store.update_assignment(id, &merged).await
    }

    pub async fn delete_assignment(&self, role: Option<Role>, id: i64) -> BookingResult<()> {
        require(role, Operation::DeleteCrewAssignment)?;
        self.store.delete_assignment(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use skyledger_store::DbClient;

    async fn service() -> CatalogService {
        let db = DbClient::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        CatalogService::new(SqliteCatalog::new(db.pool))
    }

    async fn with_route(service: &CatalogService) -> Aircraft {
        let staff = Some(Role::Staff);
        for code in ["LHR", "DXB"] {
            service
                .add_airport(
                    staff,
                    NewAirport {
                        code: code.into(),
                        name: code.into(),
                        city: code.into(),
                        country: "XX".into(),
                    },
                )
                .await
                .unwrap();
        }
        service
            .add_aircraft(staff, NewAircraft { model: "Airbus A320".into(), capacity: 180 })
            .await
            .unwrap()
    }

    fn flight(aircraft_id: i64) -> NewFlight {
        let departure = Utc::now() + Duration::days(2);
        NewFlight {
            code: "SL101".into(),
            origin: "LHR".into(),
            destination: "DXB".into(),
            departure_time: departure,
            arrival_time: departure + Duration::hours(7),
            aircraft_id,
            base_price_cents: 19950,
        }
    }

    #[tokio::test]
    async fn test_customer_add_flight_is_denied_before_storage() {
        let db = DbClient::in_memory().await.unwrap();
        db.pool.close().await;
        let service = CatalogService::new(SqliteCatalog::new(db.pool));

        // A closed pool fails every query, so anything but FORBIDDEN means storage was hit.
        let err = service.add_flight(Some(Role::Customer), flight(1)).await.unwrap_err();
        assert!(matches!(err, BookingError::Forbidden { operation: Operation::AddFlight, .. }));
    }

    #[tokio::test]
    async fn test_catalog_reads_are_public() {
        let service = service().await;
        with_route(&service).await;
        assert_eq!(service.list_airports(None).await.unwrap().len(), 2);
        assert_eq!(service.list_aircraft(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_flight_schedule_is_validated() {
        let service = service().await;
        let aircraft = with_route(&service).await;

        let mut past = flight(aircraft.id);
        past.departure_time = Utc::now() - Duration::hours(1);
        assert!(matches!(
            service.add_flight(Some(Role::Staff), past).await,
            Err(BookingError::InvalidSchedule(_))
        ));

        let created = service.add_flight(Some(Role::Staff), flight(aircraft.id)).await.unwrap();
        let backwards = FlightPatch {
            arrival_time: Some(created.departure_time - Duration::hours(1)),
            ..Default::default()
        };
        assert!(matches!(
            service.update_flight(Some(Role::Admin), created.id, backwards).await,
            Err(BookingError::InvalidSchedule(_))
        ));

        let free = FlightPatch { base_price_cents: Some(0), ..Default::default() };
        let updated = service.update_flight(Some(Role::Staff), created.id, free).await.unwrap();
        assert_eq!(updated.base_price_cents, 0);
    }

    #[tokio::test]
    async fn test_deletes_are_admin_only() {
        let service = service().await;
        let aircraft = with_route(&service).await;
        assert!(matches!(
            service.delete_aircraft(Some(Role::Staff), aircraft.id).await,
            Err(BookingError::Forbidden { .. })
        ));
        service.delete_aircraft(Some(Role::Admin), aircraft.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_passenger_patch_validation() {
        let service = service().await;
        let created = service
            .add_passenger(
                Some(Role::Customer),
                NewPassenger { name: "Adnan Khan".into(), email: "adnan@example.com".into() },
            )
            .await
            .unwrap();

        let blank = PassengerPatch { name: Some("  ".into()), email: None };
        assert!(matches!(
            service.update_passenger(Some(Role::Staff), created.id, blank).await,
            Err(BookingError::Validation(_))
        ));

        let renamed = PassengerPatch { name: Some("Adnan K.".into()), email: None };
        let updated = service.update_passenger(Some(Role::Staff), created.id, renamed).await.unwrap();
        assert_eq!(updated.name, "Adnan K.");
        assert_eq!(updated.email.expose(), "adnan@example.com");

        let found = service
            .find_passenger_by_email(Some(Role::Customer), "adnan@example.com")
            .await
            .unwrap();
        assert_eq!(found.id, created.id);
    }

    #[tokio::test]
    async fn test_crew_workflow() {
        let service = service().await;
        let aircraft = with_route(&service).await;
        let flight = service.add_flight(Some(Role::Staff), flight(aircraft.id)).await.unwrap();
        let member = service
            .add_crew_member(Some(Role::Staff), NewCrewMember { name: "Omar".into(), role: "First Officer".into() })
            .await
            .unwrap();

        let assignment = service
            .assign_crew(
                Some(Role::Staff),
                NewCrewAssignment { crew_member_id: member.id, flight_id: flight.id, duty: "Co-pilot".into() },
            )
            .await
            .unwrap();
        let patched = service
            .update_assignment(
                Some(Role::Staff),
                assignment.id,
                CrewAssignmentPatch { duty: Some("Relief pilot".into()), ..Default::default() },
            )
            .await
            .unwrap();
        assert_eq!(patched.duty, "Relief pilot");

        assert!(matches!(
            service.list_assignments(Some(Role::Customer), None).await,
            Err(BookingError::Forbidden { .. })
        ));
        service.delete_assignment(Some(Role::Admin), assignment.id).await.unwrap();
        assert!(service.list_assignments(Some(Role::Staff), Some(flight.id)).await.unwrap().is_empty());
    }
}
