use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::services::gateway_client::GatewayError;
use crate::services::payment_ledger::StorageError;

/// Broad classes the HTTP layer maps onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Unauthenticated,
    Forbidden,
    Auth,
    UpstreamRejected,
    Configuration,
    Persistence,
}

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("User not authenticated.")]
    Unauthenticated,
    #[error("Role '{0}' is not authorized to access this resource.")]
    Forbidden(String),
    #[error("Missing required field: {0}.")]
    MissingField(&'static str),
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Class not found.")]
    ItemNotFound,
    #[error("Payment not found.")]
    AttemptNotFound,
    #[error("Invalid amount for the selected class.")]
    AmountMismatch { expected: u64, supplied: u64 },
    #[error("Invalid M-Pesa phone number format. Must be like 2547XXXXXXXX.")]
    InvalidPhoneFormat,
    #[error("Server M-Pesa configuration error: {0}")]
    Configuration(String),
    #[error("M-Pesa authentication failed. Check server credentials.")]
    Auth(#[source] GatewayError),
    #[error("{0}")]
    UpstreamRejected(String),
    #[error("Payment storage error: {0}")]
    Persistence(#[from] StorageError),
}

impl PaymentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentError::Unauthenticated => ErrorKind::Unauthenticated,
            PaymentError::Forbidden(_) => ErrorKind::Forbidden,
            PaymentError::MissingField(_)
            | PaymentError::InvalidField { .. }
            | PaymentError::AmountMismatch { .. }
            | PaymentError::InvalidPhoneFormat => ErrorKind::Validation,
            PaymentError::ItemNotFound | PaymentError::AttemptNotFound => ErrorKind::NotFound,
            PaymentError::Configuration(_) => ErrorKind::Configuration,
            PaymentError::Auth(_) => ErrorKind::Auth,
            PaymentError::UpstreamRejected(_) => ErrorKind::UpstreamRejected,
            PaymentError::Persistence(_) => ErrorKind::Persistence,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation | ErrorKind::UpstreamRejected => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            // Misconfiguration on our side, never the caller's fault
            ErrorKind::Auth | ErrorKind::Configuration | ErrorKind::Persistence => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PaymentError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "success": false,
            "message": self.to_string(),
        }));
        (self.status_code(), body).into_response()
    }
}

pub type Result<T, E = PaymentError> = std::result::Result<T, E>;
