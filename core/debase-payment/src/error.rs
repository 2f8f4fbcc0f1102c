//! Error types for the purchase workflow.

use debase_license::LicenseError;
use debase_store::StorageError;
use thiserror::Error;

/// Purchase workflow errors.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Requested license count outside the purchasable range.
    #[error("invalid license count: {0}")]
    InvalidLicenseCount(i64),

    /// Client-supplied payment intent id is malformed.
    #[error("invalid payment intent id")]
    InvalidPaymentIntentId,

    /// The payment provider rejected the request.
    #[error("payment provider error: {0}")]
    Provider(String),

    /// Freshly generated license codes kept colliding with existing ones.
    #[error("could not allocate unique license codes")]
    CodeCollision,

    /// License code generation or validation failed.
    #[error(transparent)]
    License(#[from] LicenseError),

    /// Storage error while recording minted licenses.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Network error talking to the payment provider.
    #[cfg(feature = "stripe")]
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Result type for purchase operations.
pub type PaymentResult<T> = Result<T, PaymentError>;
