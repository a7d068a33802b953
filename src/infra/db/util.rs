use sqlx::error::{DatabaseError, ErrorKind};

use crate::application::repos::RepoError;

// SQLSTATE codes that the `ErrorKind` classification does not cover.
const QUERY_CANCELED: &str = "57014";
const INVALID_TEXT_REPRESENTATION: &str = "22P02";
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        sqlx::Error::Database(db) => map_database_error(db.as_ref()),
        other => RepoError::from_persistence(other),
    }
}

fn map_database_error(db: &dyn DatabaseError) -> RepoError {
    let message = db.message().to_string();
    match db.kind() {
        ErrorKind::UniqueViolation => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        // A dangling reference means the caller named a row that is gone.
        ErrorKind::ForeignKeyViolation => RepoError::InvalidInput { message },
        ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
            RepoError::Integrity { message }
        }
        _ => match db.code().as_deref() {
            Some(QUERY_CANCELED) => RepoError::Timeout,
            Some(INVALID_TEXT_REPRESENTATION | NUMERIC_VALUE_OUT_OF_RANGE) => {
                RepoError::InvalidInput { message }
            }
            _ => RepoError::Persistence(message),
        },
    }
}
