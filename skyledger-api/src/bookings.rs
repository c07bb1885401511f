use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::stream::{Stream, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use skyledger_booking::BookingRequest;
use skyledger_core::access::require;
use skyledger_core::{Booking, BookingPatch, BookingRecord, Confirmation, Operation};

use crate::{error::AppError, middleware::Principal, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(book).get(list_bookings))
        .route("/v1/bookings/stream", get(stream))
        .route(
            "/v1/bookings/{id}",
            get(get_booking).patch(update_booking).delete(delete_booking),
        )
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/passengers/{id}/bookings", get(passenger_bookings))
}

async fn book(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Json(req): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Confirmation>), AppError> {
    let confirmation = state.bookings.book(role, &req).await?;
    Ok((StatusCode::CREATED, Json(confirmation)))
}

async fn list_bookings(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
) -> Result<Json<Vec<BookingRecord>>, AppError> {
    Ok(Json(state.bookings.list_bookings(role).await?))
}

async fn get_booking(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<BookingRecord>, AppError> {
    Ok(Json(state.bookings.get_booking(role, id).await?))
}

async fn update_booking(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<BookingRecord>, AppError> {
    Ok(Json(state.bookings.update_booking(role, id, &patch).await?))
}

async fn delete_booking(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.bookings.delete_booking(role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, AppError> {
    Ok(Json(state.bookings.cancel(role, id).await?))
}

async fn passenger_bookings(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Path(passenger_id): Path<i64>,
) -> Result<Json<Vec<BookingRecord>>, AppError> {
    Ok(Json(state.bookings.bookings_for_passenger(role, passenger_id).await?))
}

#[derive(Debug, Deserialize)]
struct StreamFilter {
    flight_id: Option<i64>,
}

/// Server-sent booking events, optionally for a single flight.
async fn stream(
    State(state): State<AppState>,
    Extension(Principal(role)): Extension<Principal>,
    Query(filter): Query<StreamFilter>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    require(role, Operation::ListBookings)?;

    let only_flight = filter.flight_id;
    let rx = state.bookings.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        // Lagged receivers skip what they missed.
        let event = result.ok()?;
        if only_flight.is_some_and(|id| id != event.flight_id()) {
            return None;
        }
        Event::default()
            .event(event.name())
            .json_data(&event)
            .ok()
            .map(Ok::<_, Infallible>)
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
