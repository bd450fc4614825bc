use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::model::span::SpanStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SortOrder {
    StartAsc,
    #[default]
    StartDesc,
    DurationDesc,
}

/// Glob match against one attribute, e.g. `user_id=u-*`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttrFilter {
    pub key: String,
    pub value_glob: String,
}

impl AttrFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let (key, value_glob) = input
            .split_once('=')
            .ok_or_else(|| TraceError::Parse(format!("invalid attribute filter: {input}")))?;

        if key.trim().is_empty() || value_glob.trim().is_empty() {
            return Err(TraceError::Parse(format!(
                "invalid attribute filter: {input}"
            )));
        }

        Ok(Self {
            key: key.trim().to_string(),
            value_glob: value_glob.trim().to_string(),
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        Pattern::new(&self.value_glob)
            .map(|p| p.matches(value))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self::default()
    }
}

/// Filter for the generic span read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpanFilter {
    pub name: Option<String>,
    pub status: Option<SpanStatus>,
    pub trace_id: Option<String>,
    pub user_id: Option<String>,
    pub agent_id: Option<String>,
    /// Strict lower bound: only spans with `duration_ms` above this match.
    pub duration_above_ms: Option<f64>,
    pub attr_filters: Vec<AttrFilter>,
    pub window: TimeWindow,
    pub sort: SortOrder,
    pub limit: usize,
}

impl Default for SpanFilter {
    fn default() -> Self {
        Self {
            name: None,
            status: None,
            trace_id: None,
            user_id: None,
            agent_id: None,
            duration_above_ms: None,
            attr_filters: Vec::new(),
            window: TimeWindow::all(),
            sort: SortOrder::default(),
            limit: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attr_filter_parse_and_match() {
        let f = AttrFilter::parse("user_id=u-*").unwrap();
        assert_eq!(f.key, "user_id");
        assert!(f.matches("u-42"));
        assert!(!f.matches("svc-1"));
    }

    #[test]
    fn attr_filter_rejects_bad_input() {
        assert!(AttrFilter::parse("user_id").is_err());
        assert!(AttrFilter::parse("=x").is_err());
    }

}
