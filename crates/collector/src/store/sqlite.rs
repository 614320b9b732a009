use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info};

use super::error::{StoreError, StoreResult};
use super::partition::{MissingFieldPolicy, RowKind, StoredRow};
use super::schema::{self, COLUMNS, TABLE_NAME};
use crate::parser::Record;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of [`LogStore::provision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    AlreadyPresent,
}

/// A row that was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Appended {
    pub id: i64,
    pub kind: RowKind,
}

/// Exclusive handle on the log table.
///
/// Every `append` runs in SQLite autocommit mode with `synchronous = FULL`,
/// so a row is on disk when the call returns. The handle is released by
/// [`close`](Self::close), or on drop if the owner never got that far.
pub struct LogStore {
    conn: Connection,
    location: PathBuf,
    missing_fields: MissingFieldPolicy,
    insert_sql: String,
}

impl LogStore {
    pub fn open(path: impl AsRef<Path>, missing_fields: MissingFieldPolicy) -> StoreResult<Self> {
        let path = path.as_ref();
        info!("Opening log database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::init(conn, path.to_path_buf(), missing_fields)
    }

    pub fn open_in_memory(missing_fields: MissingFieldPolicy) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, PathBuf::from(":memory:"), missing_fields)
    }

    fn init(conn: Connection, location: PathBuf, missing_fields: MissingFieldPolicy) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        Ok(Self {
            conn,
            location,
            missing_fields,
            insert_sql: schema::insert_sql(),
        })
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// Create the table if it is absent. An existing table is left untouched
    /// but must have exactly the expected columns.
    pub fn provision(&self) -> StoreResult<Provisioned> {
        let exists = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![TABLE_NAME],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if exists {
            self.check_columns()?;
            info!("Table `{}` exists, waiting for updates", TABLE_NAME);
            return Ok(Provisioned::AlreadyPresent);
        }

        self.conn.execute(&schema::create_table_sql(), [])?;
        info!("Table `{}` created", TABLE_NAME);
        Ok(Provisioned::Created)
    }

    fn check_columns(&self) -> StoreResult<()> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", TABLE_NAME))?;
        let found = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        let expected: Vec<String> = COLUMNS.iter().map(|c| c.name.to_string()).collect();

        if found != expected {
            return Err(StoreError::SchemaMismatch {
                table: TABLE_NAME,
                expected,
                found,
            });
        }
        Ok(())
    }

    /// Persist one record as one row, errored or not.
    pub fn append(&self, record: &Record) -> StoreResult<Appended> {
        let row = StoredRow::from_record(record, self.missing_fields);
        let values = row
            .columns
            .iter()
            .map(|v| v.as_deref())
            .chain(std::iter::once(Some(row.overflow.as_str())));

        let mut stmt = self.conn.prepare_cached(&self.insert_sql)?;
        stmt.execute(params_from_iter(values))?;
        let id = self.conn.last_insert_rowid();

        debug!("Appended row {} ({:?})", id, row.kind);
        Ok(Appended { id, kind: row.kind })
    }

    /// Release the connection. Consumes the store so it runs at most once.
    pub fn close(self) -> StoreResult<()> {
        info!("Closing log database at {}", self.location.display());
        self.conn.close().map_err(|(_, e)| StoreError::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::decode;

    const TRAFFIC: &str = "<134>date=2017-08-01 time=10:00:00 devname=FW100 devid=FG100D1 logid=0001 type=traffic subtype=forward level=notice vd=root srcip=10.0.0.5 msg=\"Connection allowed\"";

    fn read_rows(path: &Path) -> Vec<Vec<Option<String>>> {
        let conn = Connection::open(path).unwrap();
        let mut stmt = conn
            .prepare("SELECT date, time, devname, devid, logid, type, subtype, level, vd, msg FROM header ORDER BY id")
            .unwrap();
        let rows = stmt
            .query_map([], |row| {
                (0..10).map(|i| row.get::<_, Option<String>>(i)).collect::<Result<Vec<_>, _>>()
            })
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        rows
    }

    fn temp_store(dir: &tempfile::TempDir) -> (LogStore, PathBuf) {
        let path = dir.path().join("fg_log_db.sqlite");
        let store = LogStore::open(&path, MissingFieldPolicy::SubstituteEmpty).unwrap();
        (store, path)
    }

    #[test]
    fn test_provision_creates_then_noops() {
        let store = LogStore::open_in_memory(MissingFieldPolicy::default()).unwrap();
        assert_eq!(store.provision().unwrap(), Provisioned::Created);
        assert_eq!(store.provision().unwrap(), Provisioned::AlreadyPresent);

        let tables: i64 = store
            .conn
            .query_row(
                "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = 'header'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[test]
    fn test_provision_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = temp_store(&dir);
        store.provision().unwrap();
        store.append(&decode(TRAFFIC)).unwrap();
        store.close().unwrap();

        let store = LogStore::open(&path, MissingFieldPolicy::SubstituteEmpty).unwrap();
        assert_eq!(store.provision().unwrap(), Provisioned::AlreadyPresent);
        store.close().unwrap();
        assert_eq!(read_rows(&path).len(), 1);
    }

    #[test]
    fn test_provisioned_columns_match_insert_columns() {
        let store = LogStore::open_in_memory(MissingFieldPolicy::default()).unwrap();
        store.provision().unwrap();
        let mut stmt = store.conn.prepare("PRAGMA table_info(header)").unwrap();
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(1))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        let inserted: Vec<String> = schema::value_columns().map(|c| c.name.to_string()).collect();
        assert_eq!(names[0], "id");
        assert_eq!(names[1..].to_vec(), inserted);
    }

    #[test]
    fn test_provision_rejects_foreign_table() {
        let store = LogStore::open_in_memory(MissingFieldPolicy::default()).unwrap();
        store.conn.execute("CREATE TABLE header (rowid INTEGER, text TEXT)", []).unwrap();
        match store.provision() {
            Err(StoreError::SchemaMismatch { found, .. }) => assert_eq!(found, vec!["rowid", "text"]),
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_append_round_trips_known_columns() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = temp_store(&dir);
        store.provision().unwrap();

        let line = TRAFFIC.replace("devname=FW100", "devname=fw-1.branch.net");
        let appended = store.append(&decode(&line)).unwrap();
        assert_eq!(appended.id, 1);
        assert_eq!(appended.kind, RowKind::Decoded);
        store.close().unwrap();

        let rows = read_rows(&path);
        let expected = [
            "2017-08-01", "10:00:00", "fw-1.branch.net", "FG100D1", "0001",
            "traffic", "forward", "notice", "root",
        ];
        for (i, value) in expected.iter().enumerate() {
            assert_eq!(rows[0][i].as_deref(), Some(*value));
        }
        assert_eq!(rows[0][9].as_deref(), Some("{srcip: 10.0.0.5}"));
    }

    #[test]
    fn test_append_binds_hostile_values() {
        let store = LogStore::open_in_memory(MissingFieldPolicy::default()).unwrap();
        store.provision().unwrap();
        let line = TRAFFIC.replace(
            "devname=FW100",
            "devname=\"x'); DROP TABLE header; --\"",
        );
        store.append(&decode(&line)).unwrap();

        let devname: String = store
            .conn
            .query_row("SELECT devname FROM header", [], |row| row.get(0))
            .unwrap();
        assert_eq!(devname, "x'); DROP TABLE header; --");
    }

    #[test]
    fn test_append_errored_record() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = temp_store(&dir);
        store.provision().unwrap();

        let appended = store.append(&decode("devname=fw-1 type=traffic")).unwrap();
        assert!(matches!(appended.kind, RowKind::Errored(_)));
        store.close().unwrap();

        let rows = read_rows(&path);
        assert!(rows[0][..9].iter().all(|v| v.is_none()));
        let overflow = rows[0][9].clone().unwrap();
        assert!(overflow.starts_with("{err: "));
        assert!(overflow.contains("raw: devname=fw-1 type=traffic"));
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = temp_store(&dir);
        store.provision().unwrap();

        for n in 0..5 {
            let line = TRAFFIC.replace("logid=0001", &format!("logid={:04}", n));
            store.append(&decode(&line)).unwrap();
        }
        store.close().unwrap();

        let logids: Vec<String> = read_rows(&path)
            .into_iter()
            .map(|row| row[4].clone().unwrap())
            .collect();
        assert_eq!(logids, vec!["0000", "0001", "0002", "0003", "0004"]);
    }

    #[test]
    fn test_append_is_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let (store, path) = temp_store(&dir);
        store.provision().unwrap();
        store.append(&decode(TRAFFIC)).unwrap();

        assert_eq!(read_rows(&path).len(), 1);
        store.close().unwrap();
    }

    #[test]
    fn test_append_without_provision_fails() {
        let store = LogStore::open_in_memory(MissingFieldPolicy::default()).unwrap();
        assert!(matches!(store.append(&decode(TRAFFIC)), Err(StoreError::Database(_))));
    }

    #[test]
    fn test_reject_policy_row() {
        let store = LogStore::open_in_memory(MissingFieldPolicy::Reject).unwrap();
        store.provision().unwrap();
        let appended = store.append(&decode("<1>date=d srcip=1.2.3.4")).unwrap();
        match appended.kind {
            RowKind::Errored(diagnostic) => assert!(diagnostic.contains("time")),
            other => panic!("unexpected kind {:?}", other),
        }
    }
}
