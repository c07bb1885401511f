use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use skyledger_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    Booking(BookingError),
    InternalServerError(String),
}

pub fn status_for(err: &BookingError) -> StatusCode {
    match err {
        BookingError::Forbidden { .. } => StatusCode::FORBIDDEN,
        BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
        BookingError::InvalidPrice(_) | BookingError::InvalidSchedule(_) => StatusCode::BAD_REQUEST,
        BookingError::CapacityExceeded { .. }
        | BookingError::DuplicateActiveBooking { .. }
        | BookingError::SeatTaken { .. }
        | BookingError::Conflict(_) => StatusCode::CONFLICT,
        BookingError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        BookingError::IdentifierCollision { .. } | BookingError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Booking(BookingError::Storage(err)) => {
                tracing::error!("Storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "STORAGE", "message": "Internal Server Error" }),
                )
            }
            AppError::Booking(err) => {
                let status = status_for(&err);
                (status, json!(err.report()))
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "INTERNAL", "message": "Internal Server Error" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        AppError::Booking(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&BookingError::CapacityExceeded { flight_id: 1, capacity: 2 }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&BookingError::InvalidPrice(-1)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&BookingError::IdentifierCollision { attempts: 5 }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_for(&BookingError::validation("x")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&BookingError::Unauthenticated("bad token".into())),
            StatusCode::UNAUTHORIZED
        );
    }
}
