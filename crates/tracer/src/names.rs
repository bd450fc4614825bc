//! Well-known span names, kept in one place so dashboards and queries can
//! group on stable strings.

pub const MEMORY_ADD: &str = "memory.add";
pub const MEMORY_SEARCH: &str = "memory.search";
pub const MEMORY_GET: &str = "memory.get";
pub const MEMORY_DELETE: &str = "memory.delete";

pub const LLM_EXTRACTION: &str = "llm.extraction";
pub const LLM_INFERENCE: &str = "llm.inference";

pub const EMBEDDING_GENERATE: &str = "embedding.generate";
pub const EMBEDDING_SEARCH: &str = "embedding.search";

pub const VECTOR_INSERT: &str = "vector.insert";
pub const VECTOR_SEARCH: &str = "vector.search";
pub const VECTOR_UPDATE: &str = "vector.update";

pub const GRAPH_SYNC: &str = "graph.sync";
pub const GRAPH_QUERY: &str = "graph.query";
pub const GRAPH_ENRICH: &str = "graph.enrich";
