use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use serde::Deserialize;

use skyledger_core::catalog::{
    Aircraft, AircraftPatch, Airport, AirportPatch, CrewAssignment, CrewAssignmentPatch,
    CrewMember, CrewMemberPatch, Flight, FlightPatch, NewAircraft, NewAirport,
    NewCrewAssignment, NewCrewMember, NewFlight, NewPassenger, Passenger, PassengerPatch,
};

use crate::{error::AppError, middleware::Principal, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        // Airports
        .route("/v1/airports", get(list_airports).post(add_airport))
        .route(
            "/v1/airports/{id}",
            get(get_airport).patch(update_airport).delete(delete_airport),
        )
        // Aircraft
        .route("/v1/aircraft", get(list_aircraft).post(add_aircraft))
        .route(
            "/v1/aircraft/{id}",
            get(get_aircraft).patch(update_aircraft).delete(delete_aircraft),
        )
        // Flights
        .route("/v1/flights", get(list_flights).post(add_flight))
        .route("/v1/flights/by-code/{code}", get(find_flight_by_code))
        .route(
            "/v1/flights/{id}",
            get(get_flight).patch(update_flight).delete(delete_flight),
        )
        // Passengers
        .route("/v1/passengers", get(list_passengers).post(add_passenger))
        .route(
            "/v1/passengers/{id}",
            get(get_passenger).patch(update_passenger).delete(delete_passenger),
        )
        // Crew
        .route("/v1/crew", get(list_crew).post(add_crew_member))
        .route(
            "/v1/crew/{id}",
            get(get_crew_member).patch(update_crew_member).delete(delete_crew_member),
        )
        .route("/v1/crew-assignments", get(list_assignments).post(assign_crew))
        .route(
            "/v1/crew-assignments/{id}",
            axum::routing::patch(update_assignment).delete(delete_assignment),
        )
}

type Created<T> = (StatusCode, Json<T>);

// ============================================================================
// Airports
// ============================================================================

async fn list_airports(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<Airport>>, AppError> {
    Ok(Json(state.catalog.list_airports(role).await?))
}

async fn add_airport(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewAirport>,
) -> Result<Created<Airport>, AppError> {
    let airport = state.catalog.add_airport(role, input).await?;
    Ok((StatusCode::CREATED, Json(airport)))
}

async fn get_airport(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Airport>, AppError> {
    Ok(Json(state.catalog.get_airport(role, id).await?))
}

async fn update_airport(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<AirportPatch>,
) -> Result<Json<Airport>, AppError> {
    Ok(Json(state.catalog.update_airport(role, id, patch).await?))
}

async fn delete_airport(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_airport(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Aircraft
// ============================================================================

async fn list_aircraft(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<Aircraft>>, AppError> {
    Ok(Json(state.catalog.list_aircraft(role).await?))
}

async fn add_aircraft(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewAircraft>,
) -> Result<Created<Aircraft>, AppError> {
    let aircraft = state.catalog.add_aircraft(role, input).await?;
    Ok((StatusCode::CREATED, Json(aircraft)))
}

async fn get_aircraft(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Aircraft>, AppError> {
    Ok(Json(state.catalog.get_aircraft(role, id).await?))
}

async fn update_aircraft(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<AircraftPatch>,
) -> Result<Json<Aircraft>, AppError> {
    Ok(Json(state.catalog.update_aircraft(role, id, patch).await?))
}

async fn delete_aircraft(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_aircraft(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Flights
// ============================================================================

async fn list_flights(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<Flight>>, AppError> {
    Ok(Json(state.catalog.list_flights(role).await?))
}

async fn add_flight(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewFlight>,
) -> Result<Created<Flight>, AppError> {
    let flight = state.catalog.add_flight(role, input).await?;
    Ok((StatusCode::CREATED, Json(flight)))
}

async fn get_flight(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.catalog.get_flight(role, id).await?))
}

async fn find_flight_by_code(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(code): Path<String>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.catalog.find_flight_by_code(role, &code).await?))
}

async fn update_flight(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<FlightPatch>,
) -> Result<Json<Flight>, AppError> {
    Ok(Json(state.catalog.update_flight(role, id, patch).await?))
}

async fn delete_flight(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_flight(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Passengers
// ============================================================================

#[derive(Debug, Deserialize)]
struct PassengerQuery {
    email: Option<String>,
}

/// `?email=` narrows the listing to one passenger and only needs lookup rights.
async fn list_passengers(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Query(query): Query<PassengerQuery>,
) -> Result<Json<Vec<Passenger>>, AppError> {
    let passengers = match query.email {
        Some(email) => vec![state.catalog.find_passenger_by_email(role, &email).await?],
        None => state.catalog.list_passengers(role).await?,
    };
    Ok(Json(passengers))
}

async fn add_passenger(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewPassenger>,
) -> Result<Created<Passenger>, AppError> {
    let passenger = state.catalog.add_passenger(role, input).await?;
    Ok((StatusCode::CREATED, Json(passenger)))
}

async fn get_passenger(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Passenger>, AppError> {
    Ok(Json(state.catalog.get_passenger(role, id).await?))
}

async fn update_passenger(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<PassengerPatch>,
) -> Result<Json<Passenger>, AppError> {
    Ok(Json(state.catalog.update_passenger(role, id, patch).await?))
}

async fn delete_passenger(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_passenger(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Crew
// ============================================================================

async fn list_crew(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<CrewMember>>, AppError> {
    Ok(Json(state.catalog.list_crew_members(role).await?))
}

async fn add_crew_member(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewCrewMember>,
) -> Result<Created<CrewMember>, AppError> {
    let member = state.catalog.add_crew_member(role, input).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

async fn get_crew_member(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<CrewMember>, AppError> {
    Ok(Json(state.catalog.get_crew_member(role, id).await?))
}

async fn update_crew_member(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<CrewMemberPatch>,
) -> Result<Json<CrewMember>, AppError> {
    Ok(Json(state.catalog.update_crew_member(role, id, patch).await?))
}

async fn delete_crew_member(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_crew_member(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AssignmentQuery {
    flight_id: Option<i64>,
}

async fn list_assignments(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Query(query): Query<AssignmentQuery>,
) -> Result<Json<Vec<CrewAssignment>>, AppError> {
    Ok(Json(state.catalog.list_assignments(role, query.flight_id).await?))
}

async fn assign_crew(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(input): Json<NewCrewAssignment>,
) -> Result<Created<CrewAssignment>, AppError> {
    let assignment = state.catalog.assign_crew(role, input).await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

async fn update_assignment(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<CrewAssignmentPatch>,
) -> Result<Json<CrewAssignment>, AppError> {
    Ok(Json(state.catalog.update_assignment(role, id, patch).await?))
}

async fn delete_assignment(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.catalog.delete_assignment(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
