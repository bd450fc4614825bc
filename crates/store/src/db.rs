use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{AccessMode, Config, Connection};
use engram_core::error::{Result, TraceError};
use engram_core::query::StoreStatus;
use tracing::debug;

use crate::schema::SCHEMA_SQL;

/// Handle to the embedded span store. Cheap to clone; all clones share one
/// connection behind a mutex, which serializes writes.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Store {
    /// Open (creating if needed) a file-backed store and run schema init.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| TraceError::Io(format!("failed to create store dir: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| TraceError::Store(format!("failed to open duckdb: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| TraceError::Store(format!("failed to initialize schema: {e}")))?;

        debug!("trace store initialized at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.display().to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| TraceError::Store(format!("failed to open in-memory db: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| TraceError::Store(format!("failed to initialize schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: ":memory:".to_string(),
        })
    }

    /// Open an existing store without write access. No schema DDL runs;
    /// the file must have been initialized by a writer already. Inserts
    /// through this handle fail.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let config = Config::default()
            .access_mode(AccessMode::ReadOnly)
            .map_err(|e| TraceError::Store(format!("failed to build duckdb config: {e}")))?;
        let conn = Connection::open_with_flags(path, config)
            .map_err(|e| TraceError::Store(format!("failed to open duckdb read-only: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.display().to_string(),
        })
    }

    // A poisoned lock is recovered rather than propagated: the connection
    // holds no state an unwinding holder could have torn, and a lock
    // failure must cost at most the span being written, never the caller.
    pub(crate) fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn status(&self) -> Result<StoreStatus> {
        let conn = self.conn();

        let spans_count = scalar_usize(&conn, "SELECT COUNT(*) FROM spans")?;
        let oldest_start = scalar_ts(&conn, "SELECT MIN(start_time) FROM spans")?;
        let newest_start = scalar_ts(&conn, "SELECT MAX(start_time) FROM spans")?;

        let db_size_bytes = if self.db_path == ":memory:" {
            0
        } else {
            fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStatus {
            db_path: self.db_path.clone(),
            db_size_bytes,
            spans_count,
            oldest_start,
            newest_start,
        })
    }
}

fn scalar_usize(conn: &Connection, sql: &str) -> Result<usize> {
    conn.query_row(sql, [], |row| row.get::<_, i64>(0))
        .map(|v| v as usize)
        .map_err(|e| TraceError::Query(format!("query failed: {e}")))
}

fn scalar_ts(conn: &Connection, sql: &str) -> Result<Option<DateTime<Utc>>> {
    conn.query_row(sql, [], |row| row.get::<_, Option<NaiveDateTime>>(0))
        .map(|opt| opt.map(|dt| dt.and_utc()))
        .map_err(|e| TraceError::Query(format!("query failed: {e}")))
}
