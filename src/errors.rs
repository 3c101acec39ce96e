use axum::http::StatusCode;
use thiserror::Error;

/// Errors produced by the booking domain.
///
/// Handlers translate these into HTTP responses; storage detail stays in the
/// `Storage` variant and is logged, never returned to the caller.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("missing or empty required field: {0}")]
    Validation(&'static str),
    #[error("a slot with the same time range already exists")]
    DuplicateSlot,
    #[error("slot not found")]
    SlotNotFound,
    #[error("no slot matches the requested time range")]
    SlotUnavailable,
    #[error("slot is fully booked")]
    SlotFull,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl BookingError {
    /// Map a domain error to the HTTP status the API surface promises.
    pub fn status(&self) -> StatusCode {
        match self {
            BookingError::Validation(_) => StatusCode::BAD_REQUEST,
            BookingError::DuplicateSlot => StatusCode::CONFLICT,
            BookingError::SlotNotFound => StatusCode::NOT_FOUND,
            BookingError::SlotUnavailable => StatusCode::BAD_REQUEST,
            BookingError::SlotFull => StatusCode::CONFLICT,
            BookingError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to the client. Storage faults get a generic
    /// body; everything else is a client error and self-describing.
    pub fn public_message(&self) -> String {
        match self {
            BookingError::Storage(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}
