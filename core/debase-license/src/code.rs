//! License code parsing and generation.
//!
//! Generated codes are [`LICENSE_CODE_LEN`] characters from
//! [`LICENSE_CODE_ALPHABET`]. Parsing is looser: it accepts any non-empty
//! alphanumeric string, so codes issued under an older scheme still load.

use crate::error::{LicenseError, LicenseResult};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of characters in a generated license code.
pub const LICENSE_CODE_LEN: usize = 10;

/// Symbols used for generated license codes. Omits `i`, `l`, `o`, `0`, `1`.
pub const LICENSE_CODE_ALPHABET: &[u8; 54] =
    b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// A license activation code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LicenseCode(String);

impl LicenseCode {
    /// Parses a user-entered license code, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] if the trimmed code is empty
    /// or contains anything other than ASCII letters and digits.
    pub fn parse(s: &str) -> LicenseResult<Self> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(LicenseError::invalid("license code", "invalid characters"));
        }
        Ok(Self(s.to_string()))
    }

    /// Generates a new license code from the operating system CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::GenerationFailure`] if the OS cannot supply
    /// random bytes.
    pub fn generate() -> LicenseResult<Self> {
        Self::generate_with(&mut OsRng)
    }

    /// Generates a new license code from the given secure random source.
    ///
    /// Each random byte indexes the alphabet modulo its length.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::GenerationFailure`] if `rng` fails.
    pub fn generate_with<R>(rng: &mut R) -> LicenseResult<Self>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let mut bytes = [0u8; LICENSE_CODE_LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| LicenseError::GenerationFailure(e.to_string()))?;

        let code = bytes
            .iter()
            .map(|&b| char::from(LICENSE_CODE_ALPHABET[usize::from(b) % LICENSE_CODE_ALPHABET.len()]))
            .collect();
        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for LicenseCode {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LicenseCode {
    type Error = LicenseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<LicenseCode> for String {
    fn from(code: LicenseCode) -> Self {
        code.0
    }
}
