use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Aggregate latency statistics over a trailing window.
///
/// Percentiles are continuous (linearly interpolated) over the sorted
/// duration sample, so `p50 <= p95 <= p99 <= max` for any non-empty set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStats {
    pub count: usize,
    pub error_count: usize,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl TraceStats {
    pub fn empty() -> Self {
        Self {
            count: 0,
            error_count: 0,
            mean_ms: 0.0,
            p50_ms: 0.0,
            p95_ms: 0.0,
            p99_ms: 0.0,
            max_ms: 0.0,
        }
    }
}

/// Per-operation breakdown, one row per distinct span name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationStats {
    pub name: String,
    pub count: usize,
    pub error_count: usize,
    pub mean_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStatus {
    pub db_path: String,
    pub db_size_bytes: u64,
    pub spans_count: usize,
    pub oldest_start: Option<DateTime<Utc>>,
    pub newest_start: Option<DateTime<Utc>>,
}
