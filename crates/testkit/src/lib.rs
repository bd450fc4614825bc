use std::collections::BTreeMap;

use chrono::{Duration, Utc};
use engram_core::model::{SpanRecord, SpanStatus};

/// A finalized OK span that started `age_minutes` ago.
pub fn finished_span(
    name: &str,
    trace_id: &str,
    span_id: &str,
    age_minutes: i64,
    duration_ms: f64,
) -> SpanRecord {
    let start = Utc::now() - Duration::minutes(age_minutes);
    SpanRecord {
        span_id: span_id.to_string(),
        trace_id: trace_id.to_string(),
        parent_span_id: None,
        name: name.to_string(),
        start_time: start,
        end_time: Some(start + Duration::milliseconds(duration_ms as i64)),
        duration_ms: Some(duration_ms),
        status: SpanStatus::Ok,
        error_message: None,
        user_id: None,
        agent_id: None,
        attributes: BTreeMap::new(),
    }
}

/// A finalized ERROR span that started `age_minutes` ago.
pub fn error_span(
    name: &str,
    trace_id: &str,
    span_id: &str,
    age_minutes: i64,
    message: &str,
) -> SpanRecord {
    let mut span = finished_span(name, trace_id, span_id, age_minutes, 25.0);
    span.status = SpanStatus::Error;
    span.error_message = Some(message.to_string());
    span
}

/// Three-span memory-add trace: a root with two sequential children.
pub fn sample_trace(trace_id: &str) -> Vec<SpanRecord> {
    let root_id = format!("{trace_id}-root");
    let mut root = finished_span("memory.add", trace_id, &root_id, 5, 200.0);

    let mut embed = finished_span("embedding.generate", trace_id, &format!("{trace_id}-embed"), 5, 120.0);
    embed.parent_span_id = Some(root_id.clone());
    embed.start_time = root.start_time + Duration::milliseconds(10);
    embed.end_time = Some(embed.start_time + Duration::milliseconds(120));

    let mut insert = finished_span("vector.insert", trace_id, &format!("{trace_id}-insert"), 5, 60.0);
    insert.parent_span_id = Some(root_id.clone());
    insert.start_time = root.start_time + Duration::milliseconds(135);
    insert.end_time = Some(insert.start_time + Duration::milliseconds(60));

    root.end_time = Some(root.start_time + Duration::milliseconds(200));
    vec![root, embed, insert]
}
