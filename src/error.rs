// =============================================================================
// ERROR MODULE
// =============================================================================
// Error taxonomy of the service and its mapping to HTTP responses.
//
// LEARNING NOTES:
// - thiserror derives Display from the #[error("...")] attributes
// - #[from] gives us `?` conversion from sqlx errors
// - IntoResponse lets handlers return AppResult<T> directly
// - Request bodies go through `ApiJson`, so a body that is not JSON or does
//   not fit the request shape is a ValidationError like any other bad input
//
// ERROR HANDLING PHILOSOPHY:
// - Client mistakes (validation, unknown id, not enough seats) are 4xx
// - Storage problems are 500 and never leak internal details
// - Cache failures never reach this type; the cache logs and falls back
// - Nothing is retried here; retry policy belongs to the caller
// =============================================================================

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::{ErrorResponse, TicketStatus};

#[derive(Debug, Error)]
pub enum AppError {
    // -------------------------------------------------------------------------
    // CLIENT ERRORS
    // -------------------------------------------------------------------------
    /// Missing or malformed input (required field, enum value, quantity)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Ticket id does not exist (or is not a valid id)
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// Reservation asks for more seats than remain
    #[error("Insufficient seats: available {available}, requested {requested}")]
    InsufficientSeats { available: i32, requested: i32 },

    /// Seat operation on a cancelled or completed ticket
    #[error("Ticket is {status}: seat operations are not allowed")]
    TicketClosed { status: TicketStatus },

    // -------------------------------------------------------------------------
    // STORAGE ERRORS
    // -------------------------------------------------------------------------
    /// Database query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InsufficientSeats { .. } => StatusCode::BAD_REQUEST,
            AppError::TicketClosed { .. } => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InsufficientSeats { .. } => "INSUFFICIENT_SEATS",
            AppError::TicketClosed { .. } => "TICKET_CLOSED",
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Message safe to show to API clients.
    fn public_message(&self) -> String {
        match self {
            AppError::Database(_) => "A database error occurred".to_string(),
            other => other.to_string(),
        }
    }
}

// =============================================================================
// HTTP RESPONSE CONVERSION
// =============================================================================
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.code();

        // Full details go to the log, only the public message to the client
        if status.is_server_error() {
            tracing::error!(error_code = error_code, error = %self, "Request failed");
        } else {
            tracing::warn!(error_code = error_code, error = %self, "Request rejected");
        }

        let body = ErrorResponse::new(error_code, self.public_message());

        (status, Json(body)).into_response()
    }
}

/// Result alias used by the store, the ledger, and the handlers.
pub type AppResult<T> = Result<T, AppError>;

// =============================================================================
// JSON BODY EXTRACTOR
// =============================================================================
/// `axum::Json` with rejections reported as `AppError::Validation`.
///
/// Covers a missing or wrong Content-Type, malformed JSON, and values of the
/// wrong type (e.g. `"price": "abc"`), which axum alone would answer with a
/// plain-text 415/400/422.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}
