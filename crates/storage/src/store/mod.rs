#![forbid(unsafe_code)]

mod closure;
mod error;
mod hierarchy;
mod maintenance;
mod nodes;
mod queries;
mod requests;

pub use error::StoreError;
pub use maintenance::{ClosureReport, RebuildReport};
pub use requests::*;

use loc_core::location::LocationId;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "locations.db";
const SCHEMA_VERSION: i64 = 1;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed location hierarchy.
///
/// One handle owns one connection. Concurrent callers open their own handle on the same
/// storage directory: mutations take the database writer lock up front (`BEGIN IMMEDIATE`)
/// and reads run inside a WAL snapshot, so no reader ever sees a half-rebuilt closure.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let mut conn = Connection::open(&db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let journal_mode = enable_wal(&conn)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        // Concurrent openers of a fresh directory queue on the writer lock and see either no
        // schema or the complete one.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        preflight_gate(&tx)?;
        install_schema(&tx)?;
        tx.commit()?;

        tracing::info!(path = %db_path.display(), journal_mode = %journal_mode, "location store opened");
        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(DB_FILE_NAME)
    }

    /// Structural mutations hold the writer lock for their whole duration.
    fn write_tx(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Read-only snapshot; dropped (rolled back) when the query is done.
    fn read_tx(&self) -> Result<Transaction<'_>, StoreError> {
        Ok(self.conn.unchecked_transaction()?)
    }
}

/// Switching a fresh file to WAL needs an exclusive lock that the busy handler does not
/// always wait for, so a concurrent opener retries until the busy timeout runs out.
fn enable_wal(conn: &Connection) -> Result<String, StoreError> {
    let started = std::time::Instant::now();
    loop {
        match conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get::<_, String>(0)) {
            Ok(mode) => return Ok(mode),
            Err(err) if is_busy(&err) && started.elapsed() < BUSY_TIMEOUT => {
                std::thread::sleep(Duration::from_millis(10));
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if matches!(code.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = ["store_state", "locations", "location_closure"]
        .into_iter()
        .collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS locations (
          id TEXT PRIMARY KEY,
          parent_id TEXT,
          building TEXT NOT NULL,
          name TEXT NOT NULL,
          number TEXT NOT NULL UNIQUE,
          area REAL NOT NULL CHECK(area >= 0),
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          FOREIGN KEY(parent_id) REFERENCES locations(id) ON DELETE RESTRICT,
          CHECK(parent_id IS NULL OR parent_id <> id)
        );

        CREATE INDEX IF NOT EXISTS idx_locations_parent
          ON locations(parent_id, number);

        CREATE TABLE IF NOT EXISTS location_closure (
          ancestor_id TEXT NOT NULL,
          descendant_id TEXT NOT NULL,
          depth INTEGER NOT NULL CHECK(depth >= 1),
          PRIMARY KEY(ancestor_id, descendant_id),
          FOREIGN KEY(ancestor_id) REFERENCES locations(id) ON DELETE CASCADE,
          FOREIGN KEY(descendant_id) REFERENCES locations(id) ON DELETE CASCADE,
          CHECK(ancestor_id <> descendant_id)
        );

        CREATE INDEX IF NOT EXISTS idx_location_closure_descendant
          ON location_closure(descendant_id, depth);

        CREATE INDEX IF NOT EXISTS idx_location_closure_ancestor_depth
          ON location_closure(ancestor_id, depth);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                && message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn map_write_conflict(err: rusqlite::Error) -> StoreError {
    if is_unique_violation(&err) {
        return StoreError::DuplicateKey;
    }
    StoreError::Sql(err)
}

fn canonicalize_id(value: &str) -> Result<String, StoreError> {
    LocationId::try_new(value)
        .map(LocationId::into_string)
        .map_err(|err| StoreError::InvalidInput(err.message()))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
