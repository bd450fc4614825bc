use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use duckdb::{params, params_from_iter};
use engram_core::error::{Result, TraceError};
use engram_core::filter::{SortOrder, SpanFilter};
use engram_core::model::attr::AttrValue;
use engram_core::model::span::{SpanRecord, SpanStatus};
use engram_core::query::{OperationStats, TraceStats};

use crate::Store;

const SPAN_COLUMNS: &str = "span_id, trace_id, parent_span_id, name, start_time, end_time, \
                            duration_ms, status, error_message, user_id, agent_id, attributes";

impl Store {
    /// Generic filtered read. Rows come back as column-keyed maps so
    /// reporting callers can render them without knowing the record type.
    pub fn query(&self, filter: &SpanFilter) -> Result<Vec<serde_json::Map<String, serde_json::Value>>> {
        let spans = self.fetch_spans(filter)?;
        let mut rows = Vec::with_capacity(spans.len());
        for span in spans {
            let value = serde_json::to_value(&span)
                .map_err(|e| TraceError::Internal(format!("serialize span row failed: {e}")))?;
            match value {
                serde_json::Value::Object(map) => rows.push(map),
                other => {
                    return Err(TraceError::Internal(format!(
                        "span row serialized to non-object: {other}"
                    )));
                }
            }
        }
        Ok(rows)
    }

    /// Spans with `duration_ms` strictly above the threshold, slowest first.
    pub fn slow_operations(&self, threshold_ms: f64, limit: usize) -> Result<Vec<SpanRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {SPAN_COLUMNS} FROM spans
             WHERE duration_ms > ?
             ORDER BY duration_ms DESC
             LIMIT ?"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TraceError::Query(format!("prepare slow ops failed: {e}")))?;
        let rows = stmt
            .query_map(params![threshold_ms, limit as i64], span_from_row)
            .map_err(|e| TraceError::Query(format!("query slow ops failed: {e}")))?;
        collect_spans(rows)
    }

    /// ERROR spans from the trailing window, newest first. The window
    /// cutoff is evaluated inside DuckDB so caller clocks never matter.
    pub fn errors(&self, window_hours: i64, limit: usize) -> Result<Vec<SpanRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {SPAN_COLUMNS} FROM spans
             WHERE status = 'ERROR'
               AND start_time > CAST(now() AS TIMESTAMP) - to_hours(CAST(? AS INTEGER))
             ORDER BY start_time DESC
             LIMIT ?"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TraceError::Query(format!("prepare errors failed: {e}")))?;
        let rows = stmt
            .query_map(params![window_hours, limit as i64], span_from_row)
            .map_err(|e| TraceError::Query(format!("query errors failed: {e}")))?;
        collect_spans(rows)
    }

    /// Aggregate latency stats over the trailing window. `quantile_cont`
    /// interpolates linearly over the sorted durations.
    pub fn stats(&self, window_hours: i64) -> Result<TraceStats> {
        let conn = self.conn();
        conn.query_row(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE status = 'ERROR'),
                    COALESCE(AVG(duration_ms), 0),
                    COALESCE(quantile_cont(duration_ms, 0.50), 0),
                    COALESCE(quantile_cont(duration_ms, 0.95), 0),
                    COALESCE(quantile_cont(duration_ms, 0.99), 0),
                    COALESCE(MAX(duration_ms), 0)
             FROM spans
             WHERE start_time > CAST(now() AS TIMESTAMP) - to_hours(CAST(? AS INTEGER))",
            params![window_hours],
            |row| {
                Ok(TraceStats {
                    count: row.get::<_, i64>(0)? as usize,
                    error_count: row.get::<_, i64>(1)? as usize,
                    mean_ms: row.get(2)?,
                    p50_ms: row.get(3)?,
                    p95_ms: row.get(4)?,
                    p99_ms: row.get(5)?,
                    max_ms: row.get(6)?,
                })
            },
        )
        .map_err(|e| TraceError::Query(format!("query stats failed: {e}")))
    }

    /// Per-operation breakdown over the trailing window, busiest first.
    pub fn stats_by_operation(&self, window_hours: i64) -> Result<Vec<OperationStats>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT name,
                        COUNT(*),
                        COUNT(*) FILTER (WHERE status = 'ERROR'),
                        COALESCE(AVG(duration_ms), 0),
                        COALESCE(quantile_cont(duration_ms, 0.95), 0),
                        COALESCE(MAX(duration_ms), 0)
                 FROM spans
                 WHERE start_time > CAST(now() AS TIMESTAMP) - to_hours(CAST(? AS INTEGER))
                 GROUP BY name
                 ORDER BY COUNT(*) DESC, name ASC",
            )
            .map_err(|e| TraceError::Query(format!("prepare op stats failed: {e}")))?;

        let rows = stmt
            .query_map(params![window_hours], |row| {
                Ok(OperationStats {
                    name: row.get(0)?,
                    count: row.get::<_, i64>(1)? as usize,
                    error_count: row.get::<_, i64>(2)? as usize,
                    mean_ms: row.get(3)?,
                    p95_ms: row.get(4)?,
                    max_ms: row.get(5)?,
                })
            })
            .map_err(|e| TraceError::Query(format!("query op stats failed: {e}")))?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row.map_err(|e| TraceError::Query(format!("map op stats row failed: {e}")))?);
        }
        Ok(out)
    }

    /// Every span of one trace, earliest first. Callers rebuild the tree
    /// from `parent_span_id`.
    pub fn trace(&self, trace_id: &str) -> Result<Vec<SpanRecord>> {
        let conn = self.conn();
        let sql = format!(
            "SELECT {SPAN_COLUMNS} FROM spans
             WHERE trace_id = ?
             ORDER BY start_time ASC"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TraceError::Query(format!("prepare trace failed: {e}")))?;
        let rows = stmt
            .query_map(params![trace_id], span_from_row)
            .map_err(|e| TraceError::Query(format!("query trace failed: {e}")))?;
        collect_spans(rows)
    }

    fn fetch_spans(&self, filter: &SpanFilter) -> Result<Vec<SpanRecord>> {
        let conn = self.conn();

        let mut where_parts = Vec::new();
        let mut args: Vec<duckdb::types::Value> = Vec::new();

        if let Some(name) = &filter.name {
            where_parts.push("name = ?");
            args.push(duckdb::types::Value::Text(name.clone()));
        }
        if let Some(status) = filter.status {
            where_parts.push("status = ?");
            args.push(duckdb::types::Value::Text(status.as_str().to_string()));
        }
        if let Some(trace_id) = &filter.trace_id {
            where_parts.push("trace_id = ?");
            args.push(duckdb::types::Value::Text(trace_id.clone()));
        }
        if let Some(user_id) = &filter.user_id {
            where_parts.push("user_id = ?");
            args.push(duckdb::types::Value::Text(user_id.clone()));
        }
        if let Some(agent_id) = &filter.agent_id {
            where_parts.push("agent_id = ?");
            args.push(duckdb::types::Value::Text(agent_id.clone()));
        }
        if let Some(above_ms) = filter.duration_above_ms {
            where_parts.push("duration_ms > ?");
            args.push(duckdb::types::Value::Double(above_ms));
        }
        if let Some(since) = filter.window.since {
            where_parts.push("start_time >= ?");
            args.push(duckdb::types::Value::Text(since.to_rfc3339()));
        }
        if let Some(until) = filter.window.until {
            where_parts.push("start_time <= ?");
            args.push(duckdb::types::Value::Text(until.to_rfc3339()));
        }

        let where_sql = if where_parts.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", where_parts.join(" AND "))
        };

        let order_sql = match filter.sort {
            SortOrder::StartAsc => "ORDER BY start_time ASC",
            SortOrder::StartDesc => "ORDER BY start_time DESC",
            SortOrder::DurationDesc => "ORDER BY duration_ms DESC",
        };

        let sql = format!("SELECT {SPAN_COLUMNS} FROM spans {where_sql} {order_sql}");

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TraceError::Query(format!("prepare span query failed: {e}")))?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), span_from_row)
            .map_err(|e| TraceError::Query(format!("query spans failed: {e}")))?;

        let mut spans = collect_spans(rows)?;
        if !filter.attr_filters.is_empty() {
            spans.retain(|span| {
                filter.attr_filters.iter().all(|f| {
                    span.attributes
                        .get(&f.key)
                        .map(|v| f.matches(&v.render()))
                        .unwrap_or(false)
                })
            });
        }
        spans.truncate(filter.limit);
        Ok(spans)
    }
}

fn span_from_row(row: &duckdb::Row<'_>) -> duckdb::Result<SpanRecord> {
    let status_raw = row.get::<_, String>(7)?;
    let status = status_raw.parse::<SpanStatus>().map_err(|e| {
        duckdb::Error::FromSqlConversionFailure(7, duckdb::types::Type::Text, Box::new(e))
    })?;

    let attrs_raw = row.get::<_, Option<String>>(11)?;
    let attributes: BTreeMap<String, AttrValue> = attrs_raw
        .as_deref()
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default();

    Ok(SpanRecord {
        span_id: row.get(0)?,
        trace_id: row.get(1)?,
        parent_span_id: row.get(2)?,
        name: row.get(3)?,
        start_time: row.get::<_, NaiveDateTime>(4)?.and_utc(),
        end_time: row.get::<_, Option<NaiveDateTime>>(5)?.map(|ts| ts.and_utc()),
        duration_ms: row.get(6)?,
        status,
        error_message: row.get(8)?,
        user_id: row.get(9)?,
        agent_id: row.get(10)?,
        attributes,
    })
}

fn collect_spans(
    rows: duckdb::MappedRows<'_, impl FnMut(&duckdb::Row<'_>) -> duckdb::Result<SpanRecord>>,
) -> Result<Vec<SpanRecord>> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| TraceError::Query(format!("map span row failed: {e}")))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use engram_core::filter::{AttrFilter, SortOrder, SpanFilter};
    use engram_core::model::{AttrValue, SpanStatus};

    use crate::Store;

    #[test]
    fn slow_operations_respects_threshold_and_order() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_spans(&[
                testkit::finished_span("fast", "t1", "s1", 5, 40.0),
                testkit::finished_span("slow", "t2", "s2", 4, 900.0),
                testkit::finished_span("slower", "t3", "s3", 3, 2500.0),
                testkit::finished_span("at-threshold", "t4", "s4", 2, 100.0),
            ])
            .unwrap();

        let slow = store.slow_operations(100.0, 10).unwrap();
        assert_eq!(slow.len(), 2);
        assert_eq!(slow[0].name, "slower");
        assert_eq!(slow[1].name, "slow");
        assert!(slow.iter().all(|s| s.duration_ms.unwrap() > 100.0));
    }

    #[test]
    fn errors_are_windowed_and_newest_first() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_spans(&[
                testkit::error_span("recent", "t1", "s1", 10, "boom"),
                testkit::error_span("older", "t2", "s2", 60, "crash"),
                // Outside a 24h window.
                testkit::error_span("ancient", "t3", "s3", 60 * 48, "gone"),
                testkit::finished_span("fine", "t4", "s4", 5, 10.0),
            ])
            .unwrap();

        let errors = store.errors(24, 10).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].name, "recent");
        assert_eq!(errors[1].name, "older");
        assert!(errors.iter().all(|s| s.status == SpanStatus::Error));
        assert!(errors.iter().all(|s| s.error_message.is_some()));
    }

    #[test]
    fn stats_percentiles_are_ordered() {
        let store = Store::open_in_memory().unwrap();
        let spans = (0..20)
            .map(|i| {
                testkit::finished_span("op", &format!("t{i}"), &format!("s{i}"), 5, (i * 50) as f64)
            })
            .collect::<Vec<_>>();
        store.insert_spans(&spans).unwrap();

        let stats = store.stats(24).unwrap();
        assert_eq!(stats.count, 20);
        assert_eq!(stats.error_count, 0);
        assert!(stats.p50_ms <= stats.p95_ms);
        assert!(stats.p95_ms <= stats.p99_ms);
        assert!(stats.p99_ms <= stats.max_ms);
        assert!(stats.mean_ms > 0.0);
    }

    #[test]
    fn stats_on_empty_window_is_zeroed() {
        let store = Store::open_in_memory().unwrap();
        let stats = store.stats(24).unwrap();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.max_ms, 0.0);
    }

    #[test]
    fn stats_by_operation_orders_by_count() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_spans(&[
                testkit::finished_span("memory.add", "t1", "s1", 5, 100.0),
                testkit::finished_span("memory.add", "t2", "s2", 5, 300.0),
                testkit::error_span("vector.insert", "t3", "s3", 5, "lost"),
            ])
            .unwrap();

        let by_op = store.stats_by_operation(24).unwrap();
        assert_eq!(by_op.len(), 2);
        assert_eq!(by_op[0].name, "memory.add");
        assert_eq!(by_op[0].count, 2);
        assert_eq!(by_op[0].error_count, 0);
        assert_eq!(by_op[1].name, "vector.insert");
        assert_eq!(by_op[1].error_count, 1);
    }

    #[test]
    fn trace_returns_spans_in_start_order() {
        let store = Store::open_in_memory().unwrap();
        store.insert_spans(&testkit::sample_trace("t1")).unwrap();
        store
            .insert_span(&testkit::finished_span("unrelated", "t2", "sx", 1, 5.0))
            .unwrap();

        let spans = store.trace("t1").unwrap();
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].name, "memory.add");
        assert!(spans.windows(2).all(|w| w[0].start_time <= w[1].start_time));
        let root_id = spans[0].span_id.clone();
        assert!(
            spans[1..]
                .iter()
                .all(|s| s.parent_span_id.as_deref() == Some(root_id.as_str()))
        );
    }

    #[test]
    fn query_filters_by_status_and_attrs() {
        let store = Store::open_in_memory().unwrap();
        let mut tagged = testkit::finished_span("memory.add", "t1", "s1", 5, 20.0);
        tagged
            .attributes
            .insert("user_id".into(), AttrValue::from("u-42"));
        store
            .insert_spans(&[
                tagged,
                testkit::finished_span("memory.add", "t2", "s2", 5, 20.0),
                testkit::error_span("memory.add", "t3", "s3", 5, "bad"),
            ])
            .unwrap();

        let rows = store
            .query(&SpanFilter {
                status: Some(SpanStatus::Ok),
                attr_filters: vec![AttrFilter::parse("user_id=u-*").unwrap()],
                sort: SortOrder::StartAsc,
                ..SpanFilter::default()
            })
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("span_id").unwrap(), "s1");
        assert_eq!(rows[0].get("status").unwrap(), "OK");
    }

    #[test]
    fn query_duration_bound_is_strict() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_spans(&[
                testkit::finished_span("a", "t1", "s1", 5, 100.0),
                testkit::finished_span("b", "t2", "s2", 5, 101.0),
            ])
            .unwrap();

        let rows = store
            .query(&SpanFilter {
                duration_above_ms: Some(100.0),
                ..SpanFilter::default()
            })
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("name").unwrap(), "b");
    }
}
