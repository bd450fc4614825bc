use duckdb::params;
use engram_core::error::{Result, TraceError};
use engram_core::model::span::SpanRecord;

use crate::Store;

impl Store {
    /// Append one finalized span. Duplicate `span_id` violates the primary
    /// key and fails; ids must never be reused.
    pub fn insert_span(&self, span: &SpanRecord) -> Result<()> {
        self.insert_spans(std::slice::from_ref(span))
    }

    /// Batch append inside one transaction, for importers.
    pub fn insert_spans(&self, spans: &[SpanRecord]) -> Result<()> {
        if spans.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| TraceError::Store(format!("begin tx failed: {e}")))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO spans
                     (span_id, trace_id, parent_span_id, name, start_time, end_time,
                      duration_ms, status, error_message, user_id, agent_id, attributes)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| TraceError::Store(format!("prepare insert span failed: {e}")))?;

            for span in spans {
                // Promoted attributes become indexed columns here, at write
                // time; the attribute document itself is stored opaque.
                let mut row = span.clone();
                row.project_indexed();

                stmt.execute(params![
                    row.span_id,
                    row.trace_id,
                    row.parent_span_id,
                    row.name,
                    row.start_time.to_rfc3339(),
                    row.end_time.map(|ts| ts.to_rfc3339()),
                    row.duration_ms,
                    row.status.as_str(),
                    row.error_message,
                    row.user_id,
                    row.agent_id,
                    row.attributes_json(),
                ])
                .map_err(|e| TraceError::Store(format!("insert span failed: {e}")))?;
            }
        }

        tx.commit()
            .map_err(|e| TraceError::Store(format!("commit spans failed: {e}")))
    }
}
