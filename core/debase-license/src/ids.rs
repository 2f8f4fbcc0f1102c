//! Identifier types for license owners and client machines.
//!
//! Every type here is a thin wrapper around a `String` whose only public
//! constructor validates and normalizes its input. Deserialization goes
//! through the same constructor, so records read back from storage are
//! checked too.

use crate::error::{LicenseError, LicenseResult};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use std::fmt;
use std::str::FromStr;

/// Length of a hex-encoded SHA-512/256 digest (1 byte == 2 hex characters).
const DIGEST_HEX_LEN: usize = 2 * 32;

/// Length of a [`UserId`] in characters.
pub const USER_ID_LEN: usize = DIGEST_HEX_LEN;

/// Length of a [`MachineId`] in characters.
pub const MACHINE_ID_LEN: usize = DIGEST_HEX_LEN;

/// Maximum length of a [`MachineInfo`] in characters.
pub const MACHINE_INFO_MAX_LEN: usize = 256;

/// Lowercases `s` and checks that it is non-empty lowercase hex.
fn sanitize_hex(s: &str, kind: &'static str) -> LicenseResult<String> {
    let s = s.to_ascii_lowercase();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(LicenseError::invalid(kind, "invalid characters"));
    }
    Ok(s)
}

/// A normalized user email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses an email, trimming surrounding whitespace and lowercasing it.
    ///
    /// The address must contain an `@` with at least one character on
    /// either side. No further RFC validation is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] if there is no such `@`.
    pub fn parse(s: &str) -> LicenseResult<Self> {
        let s = s.trim();
        if !has_separated_at(s) {
            return Err(LicenseError::invalid("email", "expected local@domain"));
        }
        Ok(Self(s.chars().map(simple_lowercase).collect()))
    }

    /// Returns the email as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One-to-one lowercase mapping of a single character.
///
/// `str::to_lowercase` applies context and multi-char mappings (final sigma,
/// `İ` to `i̇`); stored user ids were derived with the simple mapping.
fn simple_lowercase(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

/// True if some `@` in `s` has a non-newline character on both sides.
fn has_separated_at(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    chars.windows(3).any(|w| w[1] == '@' && w[0] != '\n' && w[2] != '\n')
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Email {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = LicenseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

/// Domain-scoped pseudonym for an email, used as the storage key for the
/// licenses that email owns.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Derives the user id for `email` within `domain`.
    ///
    /// Computes SHA-512/256 over `"{domain}:{email}"` and hex-encodes it.
    /// The same email yields unrelated ids under different domains.
    #[must_use]
    pub fn derive(domain: &str, email: &Email) -> Self {
        let mut hasher = Sha512_256::new();
        hasher.update(domain.as_bytes());
        hasher.update(b":");
        hasher.update(email.as_str().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Parses a previously derived user id.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] on a wrong length or a
    /// non-hex character.
    pub fn parse(s: &str) -> LicenseResult<Self> {
        if s.len() != USER_ID_LEN {
            return Err(LicenseError::invalid("user id", "invalid length"));
        }
        sanitize_hex(s, "user id").map(Self)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for UserId {
    type Error = LicenseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

/// Client machine fingerprint.
///
/// Clients hash their hardware identifiers before sending them, so the
/// server only checks the shape of the value: [`MACHINE_ID_LEN`] hex
/// characters, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MachineId(String);

impl MachineId {
    /// Parses and lowercases a machine id.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::InvalidFormat`] on a wrong length or a
    /// non-hex character.
    pub fn parse(s: &str) -> LicenseResult<Self> {
        if s.len() != MACHINE_ID_LEN {
            return Err(LicenseError::invalid("machine id", "invalid length"));
        }
        sanitize_hex(s, "machine id").map(Self)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MachineId {
    type Err = LicenseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MachineId {
    type Error = LicenseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<MachineId> for String {
    fn from(id: MachineId) -> Self {
        id.0
    }
}

/// Free-text machine description kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MachineInfo(String);

impl MachineInfo {
    /// Wraps `s`, truncating it to [`MACHINE_INFO_MAX_LEN`] characters.
    #[must_use]
    pub fn new(s: &str) -> Self {
        match s.char_indices().nth(MACHINE_INFO_MAX_LEN) {
            Some((cut, _)) => Self(s[..cut].to_string()),
            None => Self(s.to_string()),
        }
    }

    /// Returns the description as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MachineInfo {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<MachineInfo> for String {
    fn from(info: MachineInfo) -> Self {
        info.0
    }
}
