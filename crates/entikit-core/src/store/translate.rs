//! Write-path error translation

use tracing::warn;

use crate::error::{Error, StaleRow};

/// Whether `err` is a unique or primary key constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// Translate a failed write on `entity` into the domain error callers see.
///
/// Unique violations become [`Error::DuplicateKey`] carrying the original
/// error as its source; everything else passes through unchanged.
pub fn translate_write_error(entity: &str, err: sqlx::Error) -> Error {
    if is_unique_violation(&err) {
        warn!(entity, error = %err, "Write rejected by unique constraint");
        return Error::DuplicateKey {
            entity: entity.to_string(),
            source: err,
        };
    }
    Error::DatabaseError(err)
}

/// Error for a versioned write that matched no row
pub fn concurrency_conflict(entity: &str, stale: StaleRow) -> Error {
    warn!(
        entity,
        table = stale.table,
        key = stale.key,
        expected = stale.expected,
        "Write rejected by row version check"
    );
    Error::ConcurrencyConflict {
        entity: entity.to_string(),
        source: stale,
    }
}
