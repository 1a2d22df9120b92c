//! Cartographer Core Library
//!
//! This crate merges per-document concept extractions into one shared
//! knowledge graph, including:
//! - Canonical identity resolution with a replaceable synonym table
//! - Monotonic concept merging and relation deduplication
//! - Relatedness ranking between documents, concept lookup, graph export
//! - Versioned JSON persistence and full-graph rebuild
//! - Snapshot-isolated access for async callers

pub mod config;
pub mod error;
pub mod knowledge;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::knowledge::{
        Canonicalizer, ConceptCandidate, ConceptType, DocumentExtraction, Extraction,
        KnowledgeGraph, RelationCandidate, RelationType, SharedGraph, SynonymTable,
    };
    pub use crate::storage::{GraphFile, load_extraction_dir};
}
