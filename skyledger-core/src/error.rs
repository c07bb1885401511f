use serde::Serialize;
use std::fmt::Display;

use crate::access::Operation;

/// Every failure a SkyLedger operation can report to its caller.
///
/// Each variant carries a stable machine code (see [`BookingError::code`]) and a stable
/// message; neither depends on the storage backend.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("forbidden: {reason}")]
    Forbidden { operation: Operation, reason: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("price must not be negative (got {0} cents)")]
    InvalidPrice(i64),

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("flight {flight_id} is full (capacity {capacity})")]
    CapacityExceeded { flight_id: i64, capacity: i64 },

    #[error("passenger {passenger_id} already holds an active booking on flight {flight_id}")]
    DuplicateActiveBooking { passenger_id: i64, flight_id: i64 },

    #[error("could not generate a unique ticket number after {attempts} attempts")]
    IdentifierCollision { attempts: u32 },

    #[error("seat {seat_no} is already taken on flight {flight_id}")]
    SeatTaken { flight_id: i64, seat_no: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Unauthenticated(String),

    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type BookingResult<T> = Result<T, BookingError>;

impl BookingError {
    pub fn not_found(entity: &'static str, key: impl Display) -> Self {
        BookingError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        BookingError::Validation(msg.into())
    }

    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        BookingError::Storage(Box::new(err))
    }

    pub fn code(&self) -> &'static str {
        match self {
            BookingError::Forbidden { .. } => "FORBIDDEN",
            BookingError::NotFound { .. } => "NOT_FOUND",
            BookingError::InvalidPrice(_) => "INVALID_PRICE",
            BookingError::InvalidSchedule(_) => "INVALID_SCHEDULE",
            BookingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            BookingError::DuplicateActiveBooking { .. } => "DUPLICATE_ACTIVE_BOOKING",
            BookingError::IdentifierCollision { .. } => "IDENTIFIER_COLLISION",
            BookingError::SeatTaken { .. } => "SEAT_TAKEN",
            BookingError::Conflict(_) => "CONFLICT",
            BookingError::Validation(_) => "VALIDATION",
            BookingError::Unauthenticated(_) => "UNAUTHENTICATED",
            BookingError::Storage(_) => "STORAGE",
        }
    }

    /// Process exit status used by the command surface. 0 is success and 2 is clap's
    /// usage error; statuses above 14 belong to the binary itself.
    pub fn exit_code(&self) -> u8 {
        match self {
            BookingError::Forbidden { .. } => 3,
            BookingError::NotFound { .. } => 4,
            BookingError::InvalidPrice(_) => 5,
            BookingError::InvalidSchedule(_) => 6,
            BookingError::CapacityExceeded { .. } => 7,
            BookingError::DuplicateActiveBooking { .. } => 8,
            BookingError::IdentifierCollision { .. } => 9,
            BookingError::SeatTaken { .. } => 10,
            BookingError::Conflict(_) => 11,
            BookingError::Validation(_) => 12,
            BookingError::Unauthenticated(_) => 13,
            BookingError::Storage(_) => 14,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            error: self.code(),
            message: self.to_string(),
        }
    }
}

/// Structured error body shared by the HTTP and command surfaces.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorReport {
    pub error: &'static str,
    pub message: String,
}
