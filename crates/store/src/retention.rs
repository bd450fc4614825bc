use duckdb::params;
use engram_core::error::{Result, TraceError};

use crate::Store;

impl Store {
    /// Delete spans whose `start_time` is older than the retention horizon.
    /// The cutoff is computed inside DuckDB, so repeated calls with an
    /// unchanged horizon delete nothing further. Returns rows removed.
    pub fn retention_cleanup(&self, retention_days: i64) -> Result<usize> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM spans WHERE start_time < CAST(now() AS TIMESTAMP) - to_days(CAST(? AS INTEGER))",
            params![retention_days],
        )
        .map_err(|e| TraceError::Store(format!("retention delete failed: {e}")))
    }
}
