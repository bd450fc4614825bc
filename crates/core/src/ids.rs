use uuid::Uuid;

/// Mint a fresh trace id: uuid v4 in simple (dashless) form.
pub fn new_trace_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Mint a fresh span id. Ids are never reused; the store enforces uniqueness.
pub fn new_span_id() -> String {
    Uuid::new_v4().simple().to_string()
}
