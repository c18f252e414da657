//! Local SQLite store for Menu Admin.
//!
//! A single key/value table (`local_store`) holds everything the admin keeps
//! between runs: the session (`auth_token`, `user_data`, `user_role`), the
//! degraded-mode mirrors (`mock_categories`, `mock_products`, `mock_promos`)
//! and the fallback `site_config`. Values are opaque strings, usually JSON.

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Shared state holding the database connection.
pub struct DbState {
    pub conn: Mutex<Connection>,
    pub db_path: PathBuf,
}

/// Current schema version. Bump when adding new migrations.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Initialize the database at `{data_dir}/menu-admin.db`.
///
/// Creates the directory if needed, opens the connection, sets pragmas,
/// and runs any pending migrations. On corruption or open failure,
/// deletes the file and retries once.
pub fn init(data_dir: &Path) -> Result<DbState, String> {
    fs::create_dir_all(data_dir).map_err(|e| format!("Failed to create data dir: {e}"))?;

    let db_path = data_dir.join("menu-admin.db");
    info!("Opening local store at {}", db_path.display());

    let conn = match open_and_configure(&db_path) {
        Ok(c) => c,
        Err(first_err) => {
            warn!(
                "Local store open failed ({}), deleting and retrying once",
                first_err
            );
            if db_path.exists() {
                let _ = fs::remove_file(&db_path);
                let _ = fs::remove_file(db_path.with_extension("db-wal"));
                let _ = fs::remove_file(db_path.with_extension("db-shm"));
            }
            open_and_configure(&db_path)
                .map_err(|e| format!("Local store open failed after retry: {e}"))?
        }
    };

    run_migrations(&conn)?;

    Ok(DbState {
        conn: Mutex::new(conn),
        db_path,
    })
}

/// Open a throwaway in-memory store.
pub fn open_in_memory() -> Result<DbState, String> {
    let conn = Connection::open_in_memory().map_err(|e| format!("sqlite open: {e}"))?;
    conn.execute_batch("PRAGMA busy_timeout = 5000;")
        .map_err(|e| format!("pragma setup: {e}"))?;
    run_migrations(&conn)?;
    Ok(DbState {
        conn: Mutex::new(conn),
        db_path: PathBuf::from(":memory:"),
    })
}

fn open_and_configure(path: &Path) -> Result<Connection, String> {
    let conn = Connection::open(path).map_err(|e| format!("sqlite open: {e}"))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| format!("pragma setup: {e}"))?;

    Ok(conn)
}

/// Run all pending migrations up to `CURRENT_SCHEMA_VERSION`.
fn run_migrations(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )
    .map_err(|e| format!("create schema_version: {e}"))?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    info!("Migrating local store from v{current} to v{CURRENT_SCHEMA_VERSION}");

    if current < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<(), String> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS local_store (
            store_key TEXT PRIMARY KEY,
            store_value TEXT NOT NULL,
            updated_at TEXT DEFAULT (datetime('now'))
        );
        INSERT INTO schema_version (version) VALUES (1);",
    )
    .map_err(|e| format!("migrate v1: {e}"))
}

// ---------------------------------------------------------------------------
// Key/value helpers
// ---------------------------------------------------------------------------

/// Read a stored value. Returns `None` when the key is absent.
pub fn get_value(conn: &Connection, key: &str) -> Option<String> {
    conn.query_row(
        "SELECT store_value FROM local_store WHERE store_key = ?1",
        params![key],
        |row| row.get(0),
    )
    .ok()
}

/// Insert or update a value.
pub fn set_value(conn: &Connection, key: &str, value: &str) -> Result<(), String> {
    conn.execute(
        "INSERT INTO local_store (store_key, store_value, updated_at)
         VALUES (?1, ?2, datetime('now'))
         ON CONFLICT(store_key) DO UPDATE SET
            store_value = excluded.store_value,
            updated_at = excluded.updated_at",
        params![key, value],
    )
    .map_err(|e| format!("set_value[{key}]: {e}"))?;
    Ok(())
}

/// Delete a value. Succeeds when the key does not exist.
pub fn delete_value(conn: &Connection, key: &str) -> Result<(), String> {
    conn.execute("DELETE FROM local_store WHERE store_key = ?1", params![key])
        .map_err(|e| format!("delete_value[{key}]: {e}"))?;
    Ok(())
}

impl DbState {
    /// Lock the connection and read a key.
    pub fn read(&self, key: &str) -> Result<Option<String>, String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        Ok(get_value(&conn, key))
    }

    /// Lock the connection and write a key.
    pub fn write(&self, key: &str, value: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        set_value(&conn, key, value)
    }

    /// Lock the connection and remove a key.
    pub fn remove(&self, key: &str) -> Result<(), String> {
        let conn = self.conn.lock().map_err(|e| e.to_string())?;
        delete_value(&conn, key)
    }
}
