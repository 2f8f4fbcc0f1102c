//! Error types for the licensing module.

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// A client-supplied identifier is malformed.
    #[error("invalid {kind}: {reason}")]
    InvalidFormat {
        /// Which identifier failed to parse.
        kind: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The secure random source could not supply bytes.
    #[error("license code generation failed: {0}")]
    GenerationFailure(String),
}

impl LicenseError {
    pub(crate) const fn invalid(kind: &'static str, reason: &'static str) -> Self {
        Self::InvalidFormat { kind, reason }
    }

    /// Returns true if the error was caused by malformed user input.
    #[must_use]
    pub fn is_invalid_format(&self) -> bool {
        matches!(self, Self::InvalidFormat { .. })
    }
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
