//! Persisted license, machine and trial records.
//!
//! [`DBLicenses`] is the root record, stored under the owner's
//! [`UserId`](crate::UserId). It owns its licenses, which own their machine
//! bindings. Nothing here points back at its owner.
//!
//! Field names serialize in PascalCase:
//! `{Email, Licenses: {code: {Version, Machines: {id: {MachineInfo, Timestamp, IssueCount}}}}}`.

use crate::code::LicenseCode;
use crate::ids::{Email, MachineId, MachineInfo};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Record schema version.
pub type Version = u32;

/// Schema version stamped on newly created records.
pub const DB_VERSION: Version = 0;

/// Current time in seconds since the Unix epoch.
#[must_use]
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// One machine's activation under a license or trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DBMachine {
    /// Client-supplied description of the machine.
    pub machine_info: MachineInfo,
    /// First activation time (seconds since epoch). Never updated.
    pub timestamp: i64,
    /// Number of times the license has been issued to this machine.
    pub issue_count: i64,
}

impl DBMachine {
    /// Creates a binding first activated now, with an issue count of 1.
    #[must_use]
    pub fn create(machine_info: MachineInfo) -> Self {
        Self::create_at(machine_info, unix_now())
    }

    /// Creates a binding first activated at `timestamp`.
    #[must_use]
    pub fn create_at(machine_info: MachineInfo, timestamp: i64) -> Self {
        Self {
            machine_info,
            timestamp,
            issue_count: 1,
        }
    }

    /// Records another issue to the same machine.
    pub fn reissue(&mut self) {
        self.issue_count += 1;
    }
}

/// A time-limited trial bound to a single machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DBTrial {
    pub version: Version,
    /// Absolute expiration (seconds since epoch).
    pub expiration: i64,
    pub machine: DBMachine,
}

impl DBTrial {
    /// Creates a trial for `machine` that expires at `expiration`.
    #[must_use]
    pub fn new(machine: DBMachine, expiration: i64) -> Self {
        Self {
            version: DB_VERSION,
            expiration,
            machine,
        }
    }

    /// Grants a trial to a new machine binding, lasting `duration` from now.
    #[must_use]
    pub fn grant(machine_info: MachineInfo, duration: chrono::Duration) -> Self {
        let machine = DBMachine::create(machine_info);
        let expiration = machine.timestamp + duration.num_seconds();
        Self::new(machine, expiration)
    }

    /// Returns true if the trial is expired at `now` (seconds since epoch).
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expiration
    }

    /// Returns true if the trial has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(unix_now())
    }
}

/// A purchased license and every machine ever activated under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DBLicense {
    pub version: Version,
    pub machines: BTreeMap<MachineId, DBMachine>,
}

impl DBLicense {
    /// Creates a license with no machines.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: DB_VERSION,
            machines: BTreeMap::new(),
        }
    }

    /// Returns the binding for `machine_id`, if it was ever activated.
    #[must_use]
    pub fn machine(&self, machine_id: &MachineId) -> Option<&DBMachine> {
        self.machines.get(machine_id)
    }

    /// Raw access to the machine map, bypassing the activation policy.
    pub fn machines_mut(&mut self) -> &mut BTreeMap<MachineId, DBMachine> {
        &mut self.machines
    }

    /// Binds `machine_id` to this license, or re-issues an existing binding.
    ///
    /// A new binding starts with an issue count of 1. An existing one keeps
    /// its info and timestamp and has its count incremented. The number of
    /// machines is not limited here.
    pub fn activate(&mut self, machine_id: MachineId, machine_info: MachineInfo) -> &DBMachine {
        self.machines
            .entry(machine_id)
            .and_modify(DBMachine::reissue)
            .or_insert_with(|| DBMachine::create(machine_info))
    }
}

impl Default for DBLicense {
    fn default() -> Self {
        Self::new()
    }
}

/// All licenses owned by one email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DBLicenses {
    pub email: Email,
    pub licenses: BTreeMap<LicenseCode, DBLicense>,
}

impl DBLicenses {
    /// Creates an empty record for `email`.
    #[must_use]
    pub fn new(email: Email) -> Self {
        Self {
            email,
            licenses: BTreeMap::new(),
        }
    }

    /// Returns the license for `code`.
    #[must_use]
    pub fn license(&self, code: &LicenseCode) -> Option<&DBLicense> {
        self.licenses.get(code)
    }

    /// Returns the license for `code` for mutation.
    pub fn license_mut(&mut self, code: &LicenseCode) -> Option<&mut DBLicense> {
        self.licenses.get_mut(code)
    }

    /// Adds a license, returning the previous one stored under `code`.
    pub fn insert_license(&mut self, code: LicenseCode, license: DBLicense) -> Option<DBLicense> {
        self.licenses.insert(code, license)
    }
}
