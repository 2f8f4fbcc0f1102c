//! API errors and their user-facing replies.
//!
//! Malformed input is reported back verbatim. Infrastructure failures are
//! logged in full and reported only as a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use debase_license::LicenseError;
use debase_payment::PaymentError;
use debase_store::StorageError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned for any error that must not leak details.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// Message returned when an update kept losing races with other writers.
pub const PERSISTENCE_CONFLICT_MESSAGE: &str =
    "The license was updated concurrently. Please try again.";

/// Message returned for an out-of-range license count.
pub const INVALID_LICENSE_COUNT_MESSAGE: &str = "Invalid license count.";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed email, machine id or license code.
    #[error("{0}")]
    InvalidFormat(String),

    /// Purchase quantity outside the allowed range.
    #[error("invalid license count: {0}")]
    InvalidLicenseCount(i64),

    /// The user owns no license with the given code.
    #[error("license not found")]
    LicenseNotFound,

    /// The secure random source failed.
    #[error("license code generation failed: {0}")]
    GenerationFailure(String),

    /// A transactional update lost a race and retries were exhausted.
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),

    /// Any other internal failure.
    #[error("{0}")]
    Unknown(String),
}

/// Body of every error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFormat(_) | Self::InvalidLicenseCount(_) => StatusCode::BAD_REQUEST,
            Self::LicenseNotFound => StatusCode::NOT_FOUND,
            Self::PersistenceConflict(_) => StatusCode::CONFLICT,
            Self::GenerationFailure(_) | Self::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal details.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidFormat(msg) => msg.clone(),
            Self::InvalidLicenseCount(_) => INVALID_LICENSE_COUNT_MESSAGE.to_string(),
            Self::LicenseNotFound => "License not found.".to_string(),
            Self::PersistenceConflict(_) => PERSISTENCE_CONFLICT_MESSAGE.to_string(),
            Self::GenerationFailure(_) | Self::Unknown(_) => UNKNOWN_ERROR_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            Self::GenerationFailure(_) | Self::Unknown(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Self::PersistenceConflict(_) => tracing::warn!("{}", self),
            _ => tracing::info!("Rejected request: {}", self),
        }
        let body = ErrorReply {
            error: self.user_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<LicenseError> for ApiError {
    fn from(e: LicenseError) -> Self {
        match e {
            LicenseError::InvalidFormat { .. } => Self::InvalidFormat(e.to_string()),
            LicenseError::GenerationFailure(msg) => Self::GenerationFailure(msg),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict(msg) => Self::PersistenceConflict(msg),
            other => Self::Unknown(format!("storage: {other}")),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        match e {
            PaymentError::InvalidLicenseCount(n) => Self::InvalidLicenseCount(n),
            PaymentError::InvalidPaymentIntentId => Self::InvalidFormat(e.to_string()),
            PaymentError::License(e) => e.into(),
            PaymentError::Storage(e) => e.into(),
            other => Self::Unknown(format!("payment: {other}")),
        }
    }
}
