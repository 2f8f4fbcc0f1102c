//! License, machine and trial model for the Debase license server.
//!
//! This crate handles:
//! - Parsing and normalizing client-supplied identifiers (email, machine id,
//!   machine info, license code)
//! - Deriving the domain-scoped user id used as the storage key for an email
//! - Generating license codes from the OS CSPRNG
//! - The persisted license/machine/trial records
//!
//! # Design Principles
//!
//! - **Validated constructors**: identifier types can only be built through
//!   their parsing functions, so a raw string never reaches a storage key
//! - **Pseudonymous keys**: licenses are stored under a one-way hash of the
//!   email, never the email itself
//! - **No hidden mutation**: records change only through explicit field
//!   writes made by the caller
//!
//! # License Code Format
//!
//! Generated codes are [`LICENSE_CODE_LEN`] characters drawn from
//! [`LICENSE_CODE_ALPHABET`], which omits `i`, `l`, `o`, `0` and `1`.

mod code;
mod error;
mod ids;
mod model;

pub use code::{LicenseCode, LICENSE_CODE_ALPHABET, LICENSE_CODE_LEN};
pub use error::{LicenseError, LicenseResult};
pub use ids::{Email, MachineId, MachineInfo, UserId, MACHINE_ID_LEN, MACHINE_INFO_MAX_LEN, USER_ID_LEN};
pub use model::{unix_now, DBLicense, DBLicenses, DBMachine, DBTrial, Version, DB_VERSION};
