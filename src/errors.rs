//! Application error taxonomy
//!
//! Every layer surfaces failures through [`AppError`]; the HTTP layer maps
//! the variants to 400/404/409/500.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed input, non-positive quantities, insufficient point, invalid card.
    #[error("{0}")]
    BadRequest(String),

    /// User / product / coupon / order not present or not owned by the caller.
    #[error("{0}")]
    NotFound(String),

    /// Optimistic-concurrency loser (coupon already used).
    #[error("{0}")]
    Conflict(String),

    /// Unexpected failure (database, serialization, wiring).
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            other => AppError::Internal(format!("database error: {other}")),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization error: {err}"))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_display_passes_message_through() {
        let err = AppError::conflict("coupon already used");
        assert_eq!(err.to_string(), "coupon already used");
    }
}
