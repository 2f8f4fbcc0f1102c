//! Persistence gateway for Debase licenses and trials.
//!
//! Records are stored as one JSON document per key:
//! - [`DBLicenses`] under the owner's [`UserId`]
//! - [`DBTrial`] under the trial machine's [`MachineId`]
//!
//! # Transactions
//!
//! Every read-modify-write goes through an `update_or_create_*` method,
//! which applies a mutator to the current record and commits the result as
//! one transaction. Two activations racing on the same record are
//! serialized, so neither can overwrite the other's issue count.

mod duckdb_store;
mod error;
mod memory_store;

pub use duckdb_store::{open_duckdb_with_wal_recovery, DuckDbStore};
pub use error::{StorageError, StorageResult};
pub use memory_store::MemoryStore;

use debase_license::{DBLicenses, DBTrial, MachineId, UserId};

/// Read-modify-write step applied inside a store transaction.
///
/// Receives the current record (`None` if absent) and returns the record to
/// commit, or `None` to leave storage untouched. Returning an error rolls
/// the transaction back.
pub type Mutator<'a, T> = dyn FnMut(Option<T>) -> StorageResult<Option<T>> + 'a;

/// Key-value gateway for license and trial records.
pub trait LicenseStore: Send + Sync {
    /// Loads the licenses owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the user owns no record.
    fn get(&self, user_id: &UserId) -> StorageResult<DBLicenses>;

    /// Stores `licenses` under `user_id`, replacing any existing record.
    fn put(&self, user_id: &UserId, licenses: &DBLicenses) -> StorageResult<()>;

    /// Atomically applies `mutate` to the record under `user_id`.
    ///
    /// Returns the committed record, or `None` if the mutator declined to
    /// write.
    fn update_or_create(
        &self,
        user_id: &UserId,
        mutate: &mut Mutator<'_, DBLicenses>,
    ) -> StorageResult<Option<DBLicenses>>;

    /// Loads the trial granted to `machine_id`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if the machine has no trial.
    fn get_trial(&self, machine_id: &MachineId) -> StorageResult<DBTrial>;

    /// Atomically applies `mutate` to the trial under `machine_id`.
    fn update_or_create_trial(
        &self,
        machine_id: &MachineId,
        mutate: &mut Mutator<'_, DBTrial>,
    ) -> StorageResult<Option<DBTrial>>;
}
