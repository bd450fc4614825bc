pub mod context;
pub mod logging;
pub mod names;
pub mod scope;

pub use engram_core::model::{AttrValue, SpanStatus};
pub use scope::{SpanScope, Tracer};
