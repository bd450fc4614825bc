use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use engram_core::config::TraceConfig;
use engram_core::ids;
use engram_core::model::attr::AttrValue;
use engram_core::model::span::{SpanRecord, SpanStatus};
use engram_store::Store;
use tracing::{error, warn};

use crate::context::{self, SpanContext};

/// Entry point for opening spans. Cheap to clone; all clones share the
/// same store handle. Construction is fail-open: if the store cannot be
/// opened, the tracer still hands out scopes, it just records nothing.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

struct TracerInner {
    store: Option<Store>,
}

impl Tracer {
    pub fn new(cfg: &TraceConfig) -> Self {
        if !cfg.enabled {
            return Self::disabled();
        }
        match Store::open(&cfg.store_path) {
            Ok(store) => Self::with_store(store),
            Err(e) => {
                error!("failed to open trace store, tracing disabled: {e}");
                Self::disabled()
            }
        }
    }

    pub fn with_store(store: Store) -> Self {
        Self {
            inner: Arc::new(TracerInner { store: Some(store) }),
        }
    }

    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(TracerInner { store: None }),
        }
    }

    pub fn store(&self) -> Option<&Store> {
        self.inner.store.as_ref()
    }

    pub fn open_scope(&self, name: &str) -> SpanScope {
        self.open_scope_with(name, std::iter::empty::<(String, AttrValue)>())
    }

    /// Open a span and make it current for this thread. With no enclosing
    /// scope this starts a new trace; nested, it inherits the enclosing
    /// trace id and links the parent.
    pub fn open_scope_with<I, K, V>(&self, name: &str, attributes: I) -> SpanScope
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        let parent = context::current();
        let trace_id = parent
            .as_ref()
            .map(|p| p.trace_id.clone())
            .unwrap_or_else(ids::new_trace_id);
        let parent_span_id = parent.map(|p| p.span_id);
        let span_id = ids::new_span_id();

        let previous = context::push(SpanContext {
            trace_id: trace_id.clone(),
            span_id: span_id.clone(),
        });

        let mut attrs = BTreeMap::new();
        for (key, value) in attributes {
            attrs.insert(key.into(), value.into());
        }

        SpanScope {
            tracer: self.clone(),
            record: Some(SpanRecord {
                span_id,
                trace_id,
                parent_span_id,
                name: name.to_string(),
                start_time: Utc::now(),
                end_time: None,
                duration_ms: None,
                status: SpanStatus::Ok,
                error_message: None,
                user_id: None,
                agent_id: None,
                attributes: attrs,
            }),
            started: Instant::now(),
            previous,
        }
    }

    /// Run `work` inside a span. An `Err` is recorded on the span, then
    /// handed back unchanged; the span itself never alters the outcome.
    pub fn in_scope<T, E, F>(&self, name: &str, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut SpanScope) -> Result<T, E>,
        E: std::error::Error,
    {
        let mut scope = self.open_scope(name);
        let result = work(&mut scope);
        if let Err(e) = &result {
            scope.record_error(e);
        }
        result
    }

    /// Turn a unit of work into a traced unit of work.
    pub fn wrap<T, E, F>(&self, name: impl Into<String>, work: F) -> impl FnOnce() -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: std::error::Error,
    {
        let tracer = self.clone();
        let name = name.into();
        move || tracer.in_scope(&name, |_| work())
    }
}

/// An open span. Finalization happens in `Drop`, on every exit path:
/// duration is taken from a monotonic clock, the thread context is popped,
/// and the row is persisted exactly once.
pub struct SpanScope {
    tracer: Tracer,
    record: Option<SpanRecord>,
    started: Instant,
    previous: Option<SpanContext>,
}

impl SpanScope {
    pub fn span_id(&self) -> &str {
        &self.record.as_ref().expect("span not finalized").span_id
    }

    pub fn trace_id(&self) -> &str {
        &self.record.as_ref().expect("span not finalized").trace_id
    }

    /// Merge one attribute into the span's document.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        if let Some(record) = self.record.as_mut() {
            record.attributes.insert(key.into(), value.into());
        }
    }

    /// Like [`set_attribute`](Self::set_attribute) but ignores `None`,
    /// matching the ingestion contract's "missing values are dropped".
    pub fn set_attribute_opt(
        &mut self,
        key: impl Into<String>,
        value: Option<impl Into<AttrValue>>,
    ) {
        if let Some(value) = value {
            self.set_attribute(key, value);
        }
    }

    /// Set the span outcome. The ERROR state is sticky: once set, a later
    /// OK is ignored.
    pub fn set_status(&mut self, status: SpanStatus, message: Option<&str>) {
        let Some(record) = self.record.as_mut() else {
            return;
        };
        if record.status.is_error() && status == SpanStatus::Ok {
            return;
        }
        record.status = status;
        if let Some(message) = message {
            record.error_message = Some(message.to_string());
        }
    }

    /// Mark the span failed and capture the error's type and message as
    /// attributes. The error itself is untouched; re-raising is the
    /// caller's job.
    pub fn record_error<E>(&mut self, error: &E)
    where
        E: std::error::Error + ?Sized,
    {
        let message = error.to_string();
        self.set_attribute("exception.type", std::any::type_name::<E>());
        self.set_attribute("exception.message", message.clone());
        self.set_status(SpanStatus::Error, Some(&message));
    }
}

impl Drop for SpanScope {
    fn drop(&mut self) {
        let Some(mut record) = self.record.take() else {
            return;
        };
        context::pop(self.previous.take());

        if !record.status.is_error() && std::thread::panicking() {
            record.status = SpanStatus::Error;
            record.error_message = Some("panicked inside traced scope".to_string());
        }

        record.duration_ms = Some(self.started.elapsed().as_secs_f64() * 1000.0);
        record.end_time = Some(Utc::now());

        let Some(store) = self.tracer.inner.store.as_ref() else {
            return;
        };
        // Fail-open: a lost span must never become a failed operation.
        if let Err(e) = store.insert_span(&record) {
            warn!(span = record.name.as_str(), "dropping span, failed to persist: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_tracer_still_scopes_and_pops() {
        let tracer = Tracer::disabled();
        {
            let scope = tracer.open_scope("memory.get");
            assert!(context::current().is_some());
            assert_eq!(context::current().unwrap().span_id, scope.span_id());
        }
        assert!(context::current().is_none());
    }

    #[test]
    fn error_status_is_sticky() {
        let tracer = Tracer::disabled();
        let mut scope = tracer.open_scope("memory.add");
        scope.set_status(SpanStatus::Error, Some("boom"));
        scope.set_status(SpanStatus::Ok, None);
        assert!(scope.record.as_ref().unwrap().status.is_error());
        assert_eq!(
            scope.record.as_ref().unwrap().error_message.as_deref(),
            Some("boom")
        );
    }

    #[test]
    fn optional_attributes_drop_none() {
        let tracer = Tracer::disabled();
        let mut scope = tracer.open_scope("memory.add");
        scope.set_attribute_opt("user_id", Some("u-1"));
        scope.set_attribute_opt("agent_id", None::<&str>);
        let attrs = &scope.record.as_ref().unwrap().attributes;
        assert!(attrs.contains_key("user_id"));
        assert!(!attrs.contains_key("agent_id"));
    }
}
