//! DuckDB-backed license store.

use crate::error::{StorageError, StorageResult};
use crate::{LicenseStore, Mutator};
use debase_license::{DBLicenses, DBTrial, MachineId, UserId};
use duckdb::{params, Connection, OptionalExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Open a DuckDB connection with stale WAL recovery.
///
/// If the initial open fails and a `.wal` file exists alongside the database,
/// it is removed and the open is retried once. This handles the common case
/// where an unclean shutdown leaves a WAL file that prevents reopening.
pub fn open_duckdb_with_wal_recovery(path: &Path) -> StorageResult<Connection> {
    match Connection::open(path) {
        Ok(conn) => Ok(conn),
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if wal_path.exists() {
                warn!(
                    wal = %wal_path.display(),
                    "DuckDB open failed, removing stale WAL and retrying"
                );
                std::fs::remove_file(&wal_path)?;
                return Connection::open(path).map_err(Into::into);
            }
            Err(first_err.into())
        }
    }
}

/// Table holding one JSON document per key.
#[derive(Clone, Copy)]
enum Table {
    Licenses,
    Trials,
}

impl Table {
    const fn select_sql(self) -> &'static str {
        match self {
            Self::Licenses => "SELECT document FROM licenses WHERE user_id = ?",
            Self::Trials => "SELECT document FROM trials WHERE machine_id = ?",
        }
    }

    const fn upsert_sql(self) -> &'static str {
        match self {
            Self::Licenses => "INSERT OR REPLACE INTO licenses (user_id, document) VALUES (?, ?)",
            Self::Trials => "INSERT OR REPLACE INTO trials (machine_id, document) VALUES (?, ?)",
        }
    }
}

/// Persistent store for license and trial records backed by DuckDB.
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_duckdb_with_wal_recovery(path)?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory store.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS licenses (
                user_id VARCHAR PRIMARY KEY,
                document VARCHAR NOT NULL
            );

            CREATE TABLE IF NOT EXISTS trials (
                machine_id VARCHAR PRIMARY KEY,
                document VARCHAR NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    fn read<T: DeserializeOwned>(conn: &Connection, table: Table, key: &str) -> StorageResult<Option<T>> {
        let document: Option<String> = conn
            .query_row(table.select_sql(), params![key], |row| row.get(0))
            .optional()?;
        document
            .map(|doc| serde_json::from_str(&doc))
            .transpose()
            .map_err(Into::into)
    }

    fn write<T: Serialize>(conn: &Connection, table: Table, key: &str, value: &T) -> StorageResult<()> {
        let document = serde_json::to_string(value)?;
        conn.execute(table.upsert_sql(), params![key, document])?;
        Ok(())
    }

    fn update<T>(&self, table: Table, key: &str, mutate: &mut Mutator<'_, T>) -> StorageResult<Option<T>>
    where
        T: Serialize + DeserializeOwned,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current = Self::read(&tx, table, key)?;
        let Some(next) = mutate(current)? else {
            tx.rollback()?;
            debug!(key, "update declined by mutator");
            return Ok(None);
        };

        Self::write(&tx, table, key, &next)?;
        tx.commit()?;
        Ok(Some(next))
    }
}

impl LicenseStore for DuckDbStore {
    fn get(&self, user_id: &UserId) -> StorageResult<DBLicenses> {
        let conn = self.lock()?;
        Self::read(&conn, Table::Licenses, user_id.as_str())?
            .ok_or_else(|| StorageError::NotFound(user_id.to_string()))
    }

    fn put(&self, user_id: &UserId, licenses: &DBLicenses) -> StorageResult<()> {
        let conn = self.lock()?;
        Self::write(&conn, Table::Licenses, user_id.as_str(), licenses)
    }

    fn update_or_create(
        &self,
        user_id: &UserId,
        mutate: &mut Mutator<'_, DBLicenses>,
    ) -> StorageResult<Option<DBLicenses>> {
        self.update(Table::Licenses, user_id.as_str(), mutate)
    }

    fn get_trial(&self, machine_id: &MachineId) -> StorageResult<DBTrial> {
        let conn = self.lock()?;
        Self::read(&conn, Table::Trials, machine_id.as_str())?
            .ok_or_else(|| StorageError::NotFound(machine_id.to_string()))
    }

    fn update_or_create_trial(
        &self,
        machine_id: &MachineId,
        mutate: &mut Mutator<'_, DBTrial>,
    ) -> StorageResult<Option<DBTrial>> {
        self.update(Table::Trials, machine_id.as_str(), mutate)
    }
}
