/// Idempotent schema, executed once when a writable store is opened.
/// `span_id` is the primary key: span ids are minted per scope and never
/// reused, so a duplicate insert is a caller bug and fails hard.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS spans (
  span_id TEXT PRIMARY KEY,
  trace_id TEXT NOT NULL,
  parent_span_id TEXT,
  name TEXT NOT NULL,
  start_time TIMESTAMP NOT NULL,
  end_time TIMESTAMP,
  duration_ms DOUBLE,
  status TEXT NOT NULL DEFAULT 'OK',
  error_message TEXT,
  user_id TEXT,
  agent_id TEXT,
  attributes TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_spans_trace_id ON spans(trace_id);
CREATE INDEX IF NOT EXISTS idx_spans_start_time ON spans(start_time);
CREATE INDEX IF NOT EXISTS idx_spans_name ON spans(name);
CREATE INDEX IF NOT EXISTS idx_spans_user_id ON spans(user_id);
CREATE INDEX IF NOT EXISTS idx_spans_status ON spans(status);
"#;
