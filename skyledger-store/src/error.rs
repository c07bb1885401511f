use skyledger_core::BookingError;
use tracing::error;

/// Any sqlx failure we have no better classification for.
pub(crate) fn storage(err: sqlx::Error) -> BookingError {
    error!("Database error: {}", err);
    BookingError::storage(err)
}

/// Classify a failed insert/update/delete against `entity`.
pub(crate) fn write_error(entity: &str, err: sqlx::Error) -> BookingError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return BookingError::Conflict(format!("{} already exists", entity));
        }
        if db.is_foreign_key_violation() {
            return BookingError::Conflict(format!(
                "{} references a missing record or is still referenced by other records",
                entity
            ));
        }
        if db.is_check_violation() {
            return BookingError::Validation(format!("{}: {}", entity, db.message()));
        }
    }
    storage(err)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}
