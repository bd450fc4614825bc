pub mod attr;
pub mod span;

pub use attr::AttrValue;
pub use span::{SpanRecord, SpanStatus};
