use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::model::attr::AttrValue;

/// Span outcome. Transitions are one-way: once `Error`, always `Error`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpanStatus {
    #[default]
    Ok,
    Error,
}

impl SpanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl FromStr for SpanStatus {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OK" => Ok(Self::Ok),
            "ERROR" => Ok(Self::Error),
            _ => Err(TraceError::Parse(format!("unknown span status: {s}"))),
        }
    }
}

/// One row in the spans table. Immutable once persisted; the opening scope
/// owns it exclusively until then.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    pub span_id: String,
    pub trace_id: String,
    pub parent_span_id: Option<String>,
    pub name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_ms: Option<f64>,
    pub status: SpanStatus,
    pub error_message: Option<String>,
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl SpanRecord {
    pub fn attributes_json(&self) -> String {
        serde_json::to_string(&self.attributes).unwrap_or_else(|_| "{}".to_string())
    }

    /// Copy the promoted attributes into their indexed columns. Runs at
    /// write time; explicit values already on the record win.
    pub fn project_indexed(&mut self) {
        if self.user_id.is_none() {
            self.user_id = self
                .attributes
                .get("user_id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
        if self.agent_id.is_none() {
            self.agent_id = self
                .attributes
                .get("agent_id")
                .and_then(|v| v.as_str())
                .map(str::to_string);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record() -> SpanRecord {
        SpanRecord {
            span_id: "s1".into(),
            trace_id: "t1".into(),
            parent_span_id: None,
            name: "memory.add".into(),
            start_time: chrono::Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            end_time: None,
            duration_ms: None,
            status: SpanStatus::Ok,
            error_message: None,
            user_id: None,
            agent_id: None,
            attributes: BTreeMap::new(),
        }
    }

    #[test]
    fn status_round_trips() {
        assert_eq!("ok".parse::<SpanStatus>().unwrap(), SpanStatus::Ok);
        assert_eq!("ERROR".parse::<SpanStatus>().unwrap(), SpanStatus::Error);
        assert!("fatal".parse::<SpanStatus>().is_err());
        assert_eq!(SpanStatus::Error.as_str(), "ERROR");
    }

    #[test]
    fn projects_promoted_attributes() {
        let mut span = record();
        span.attributes
            .insert("user_id".into(), AttrValue::from("u-42"));
        span.attributes
            .insert("agent_id".into(), AttrValue::from("planner"));
        span.project_indexed();
        assert_eq!(span.user_id.as_deref(), Some("u-42"));
        assert_eq!(span.agent_id.as_deref(), Some("planner"));
    }

    #[test]
    fn projection_keeps_explicit_columns() {
        let mut span = record();
        span.user_id = Some("explicit".into());
        span.attributes
            .insert("user_id".into(), AttrValue::from("from-attrs"));
        span.project_indexed();
        assert_eq!(span.user_id.as_deref(), Some("explicit"));
    }

    #[test]
    fn attributes_json_is_flat_object() {
        let mut span = record();
        span.attributes.insert("count".into(), AttrValue::from(3i64));
        span.attributes
            .insert("model".into(), AttrValue::from("qwen3"));
        assert_eq!(
            span.attributes_json(),
            "{\"count\":3,\"model\":\"qwen3\"}"
        );
    }
}
