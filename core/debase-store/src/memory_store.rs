//! In-memory license store for tests and ephemeral deployments.

use crate::error::{StorageError, StorageResult};
use crate::{LicenseStore, Mutator};
use debase_license::{DBLicenses, DBTrial, MachineId, UserId};
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

/// License store that keeps every record in process memory.
///
/// Each map sits behind its own mutex, held for the whole of an update, so
/// updates to the same map are serialized.
#[derive(Default)]
pub struct MemoryStore {
    licenses: Mutex<HashMap<UserId, DBLicenses>>,
    trials: Mutex<HashMap<MachineId, DBTrial>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn update<K, V>(map: &Mutex<HashMap<K, V>>, key: &K, mutate: &mut Mutator<'_, V>) -> StorageResult<Option<V>>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let mut map = map.lock().map_err(|_| StorageError::Poisoned)?;
    let current = map.get(key).cloned();
    let next = mutate(current)?;
    if let Some(value) = &next {
        map.insert(key.clone(), value.clone());
    }
    Ok(next)
}

impl LicenseStore for MemoryStore {
    fn get(&self, user_id: &UserId) -> StorageResult<DBLicenses> {
        let map = self.licenses.lock().map_err(|_| StorageError::Poisoned)?;
        map.get(user_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(user_id.to_string()))
    }

    fn put(&self, user_id: &UserId, licenses: &DBLicenses) -> StorageResult<()> {
        let mut map = self.licenses.lock().map_err(|_| StorageError::Poisoned)?;
        map.insert(user_id.clone(), licenses.clone());
        Ok(())
    }

    fn update_or_create(
        &self,
        user_id: &UserId,
        mutate: &mut Mutator<'_, DBLicenses>,
    ) -> StorageResult<Option<DBLicenses>> {
        update(&self.licenses, user_id, mutate)
    }

    fn get_trial(&self, machine_id: &MachineId) -> StorageResult<DBTrial> {
        let map = self.trials.lock().map_err(|_| StorageError::Poisoned)?;
        map.get(machine_id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(machine_id.to_string()))
    }

    fn update_or_create_trial(
        &self,
        machine_id: &MachineId,
        mutate: &mut Mutator<'_, DBTrial>,
    ) -> StorageResult<Option<DBTrial>> {
        update(&self.trials, machine_id, mutate)
    }
}
