use debase_license::{
    DBLicense, DBLicenses, DBMachine, DBTrial, Email, LicenseCode, MachineId, MachineInfo, UserId,
};
use debase_store::{DuckDbStore, LicenseStore, MemoryStore, StorageError, StorageResult};

const DOMAIN: &str = "debase.test";

fn stores() -> Vec<(&'static str, Box<dyn LicenseStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("duckdb", Box::new(DuckDbStore::open_in_memory().unwrap())),
    ]
}

fn email() -> Email {
    Email::parse("owner@example.com").unwrap()
}

fn user_id() -> UserId {
    UserId::derive(DOMAIN, &email())
}

fn machine_id() -> MachineId {
    MachineId::parse(&"ab".repeat(32)).unwrap()
}

fn sample_licenses() -> DBLicenses {
    let mut licenses = DBLicenses::new(email());
    let mut license = DBLicense::new();
    license.activate(machine_id(), MachineInfo::new("test machine"));
    licenses.insert_license(LicenseCode::parse("Abc234xyz9").unwrap(), license);
    licenses
}

// ── Licenses ─────────────────────────────────────────────────────

#[test]
fn get_missing_is_not_found() {
    for (name, store) in stores() {
        let err = store.get(&user_id()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)), "{name}: {err}");
    }
}

#[test]
fn put_then_get() {
    for (name, store) in stores() {
        let licenses = sample_licenses();
        store.put(&user_id(), &licenses).unwrap();
        assert_eq!(store.get(&user_id()).unwrap(), licenses, "{name}");
    }
}

#[test]
fn put_replaces_existing() {
    for (name, store) in stores() {
        store.put(&user_id(), &sample_licenses()).unwrap();
        let empty = DBLicenses::new(email());
        store.put(&user_id(), &empty).unwrap();
        assert!(store.get(&user_id()).unwrap().licenses.is_empty(), "{name}");
    }
}

#[test]
fn update_or_create_creates_missing_record() {
    for (name, store) in stores() {
        let committed = store
            .update_or_create(&user_id(), &mut |current: Option<DBLicenses>| {
                assert!(current.is_none());
                Ok(Some(sample_licenses()))
            })
            .unwrap();
        assert_eq!(committed, Some(sample_licenses()), "{name}");
        assert_eq!(store.get(&user_id()).unwrap(), sample_licenses(), "{name}");
    }
}

#[test]
fn update_or_create_sees_current_record() {
    for (name, store) in stores() {
        store.put(&user_id(), &sample_licenses()).unwrap();
        let code = LicenseCode::parse("Abc234xyz9").unwrap();
        store
            .update_or_create(&user_id(), &mut |current: Option<DBLicenses>| {
                let mut licenses = current.expect("record exists");
                licenses
                    .license_mut(&code)
                    .unwrap()
                    .activate(machine_id(), MachineInfo::default());
                Ok(Some(licenses))
            })
            .unwrap();

        let stored = store.get(&user_id()).unwrap();
        let machine = stored.license(&code).unwrap().machine(&machine_id()).unwrap();
        assert_eq!(machine.issue_count, 2, "{name}");
    }
}

#[test]
fn declined_update_writes_nothing() {
    for (name, store) in stores() {
        let result = store
            .update_or_create(&user_id(), &mut |_: Option<DBLicenses>| Ok(None))
            .unwrap();
        assert!(result.is_none(), "{name}");
        assert!(store.get(&user_id()).is_err(), "{name}");
    }
}

#[test]
fn failed_mutator_leaves_record_unchanged() {
    for (name, store) in stores() {
        store.put(&user_id(), &sample_licenses()).unwrap();
        let result: StorageResult<_> =
            store.update_or_create(&user_id(), &mut |_: Option<DBLicenses>| {
                Err(StorageError::NotFound("license".into()))
            });
        assert!(result.is_err(), "{name}");
        assert_eq!(store.get(&user_id()).unwrap(), sample_licenses(), "{name}");
    }
}

#[test]
fn records_are_isolated_per_user() {
    for (name, store) in stores() {
        store.put(&user_id(), &sample_licenses()).unwrap();
        let other = UserId::derive("other.domain", &email());
        assert!(store.get(&other).is_err(), "{name}");
    }
}

// ── Trials ───────────────────────────────────────────────────────

#[test]
fn trial_roundtrip() {
    for (name, store) in stores() {
        assert!(matches!(store.get_trial(&machine_id()), Err(StorageError::NotFound(_))));

        let trial = DBTrial::new(DBMachine::create_at(MachineInfo::new("vm"), 10), 20);
        store
            .update_or_create_trial(&machine_id(), &mut |current: Option<DBTrial>| {
                Ok(Some(current.unwrap_or_else(|| trial.clone())))
            })
            .unwrap();
        assert_eq!(store.get_trial(&machine_id()).unwrap(), trial, "{name}");
    }
}

#[test]
fn trial_update_keeps_expiration() {
    for (name, store) in stores() {
        let trial = DBTrial::new(DBMachine::create_at(MachineInfo::new("vm"), 10), 20);
        for _ in 0..3 {
            store
                .update_or_create_trial(&machine_id(), &mut |current: Option<DBTrial>| {
                    let mut t = current.unwrap_or_else(|| trial.clone());
                    if t.machine.timestamp != 10 || t.expiration != 20 {
                        return Err(StorageError::NotFound("unexpected trial".into()));
                    }
                    t.machine.reissue();
                    Ok(Some(t))
                })
                .unwrap();
        }
        let stored = store.get_trial(&machine_id()).unwrap();
        assert_eq!(stored.machine.issue_count, 4, "{name}");
        assert_eq!(stored.expiration, 20, "{name}");
    }
}

// ── DuckDB specifics ─────────────────────────────────────────────

#[test]
fn duckdb_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("licenses.duckdb");

    {
        let store = DuckDbStore::open(&path).unwrap();
        store.put(&user_id(), &sample_licenses()).unwrap();
    }

    let store = DuckDbStore::open(&path).unwrap();
    assert_eq!(store.get(&user_id()).unwrap(), sample_licenses());
}

#[test]
fn storage_error_display() {
    assert!(StorageError::NotFound("abc".into()).to_string().contains("not found"));
    assert!(StorageError::Conflict("x".into()).to_string().contains("conflict"));
    assert!(StorageError::Conflict("x".into()).is_conflict());
    assert!(!StorageError::Poisoned.is_conflict());
}

#[test]
fn duckdb_errors_mentioning_conflict_are_not_races() {
    let conn = duckdb::Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (id INTEGER, v INTEGER)").unwrap();

    for sql in [
        "SELECT * FROM conflict_log",
        "INSERT INTO t VALUES (1, 1) ON CONFLICT (id) DO NOTHING",
    ] {
        let err = StorageError::from(conn.execute_batch(sql).unwrap_err());
        assert!(matches!(err, StorageError::Database(_)), "{sql}: {err}");
        assert!(!err.is_conflict());
    }
}

#[test]
fn duckdb_write_write_race_is_conflict() {
    let a = duckdb::Connection::open_in_memory().unwrap();
    a.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER); INSERT INTO t VALUES (1, 0);")
        .unwrap();
    let b = a.try_clone().unwrap();

    a.execute_batch("BEGIN TRANSACTION; UPDATE t SET v = 1 WHERE id = 1;").unwrap();
    let err = b
        .execute_batch("BEGIN TRANSACTION; UPDATE t SET v = 2 WHERE id = 1; COMMIT;")
        .unwrap_err();
    let err = StorageError::from(err);
    assert!(err.is_conflict(), "{err}");
}
