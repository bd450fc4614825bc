use std::cell::RefCell;

/// Identity of the innermost open span on this thread. New scopes read it
/// to inherit a trace and link their parent without parameter threading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanContext {
    pub trace_id: String,
    pub span_id: String,
}

thread_local! {
    static CURRENT: RefCell<Option<SpanContext>> = const { RefCell::new(None) };
}

/// Make `ctx` current for this thread, returning what was current before.
/// The caller must hand that value back to [`pop`] when the scope closes.
pub fn push(ctx: SpanContext) -> Option<SpanContext> {
    CURRENT.with(|slot| slot.borrow_mut().replace(ctx))
}

/// Restore the context saved by the matching [`push`].
pub fn pop(previous: Option<SpanContext>) {
    CURRENT.with(|slot| *slot.borrow_mut() = previous);
}

pub fn current() -> Option<SpanContext> {
    CURRENT.with(|slot| slot.borrow().clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(trace: &str, span: &str) -> SpanContext {
        SpanContext {
            trace_id: trace.to_string(),
            span_id: span.to_string(),
        }
    }

    #[test]
    fn push_pop_restores_previous() {
        assert_eq!(current(), None);
        let prev = push(ctx("t1", "a"));
        assert_eq!(prev, None);
        assert_eq!(current().unwrap().span_id, "a");

        let prev_inner = push(ctx("t1", "b"));
        assert_eq!(prev_inner.as_ref().unwrap().span_id, "a");
        pop(prev_inner);
        assert_eq!(current().unwrap().span_id, "a");
        pop(prev);
        assert_eq!(current(), None);
    }

    #[test]
    fn threads_do_not_share_context() {
        let prev = push(ctx("t-main", "main"));
        let seen = std::thread::spawn(current).join().unwrap();
        assert_eq!(seen, None);
        pop(prev);
    }
}
