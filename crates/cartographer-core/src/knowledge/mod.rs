//! Cross-document knowledge graph
//!
//! Per-document extractions (concepts and typed relations found in one piece
//! of content) are merged into a single deduplicated graph:
//!
//! - `canonical`: raw surface form -> canonical concept name
//! - `concept`: concept records and their monotonic merge policy
//! - `relation`: typed, directed edges deduplicated by `(from, to, type)`
//! - `source_index`: which concepts each document mentions
//! - `graph`: ingestion and rebuild over the stores above
//! - `query`: relatedness ranking, concept lookup, export
//! - `extraction`: untrusted extractor output and its validation
//! - `shared`: snapshot-isolated handle for async callers
//!
//! Canonicalization depends on what is already stored, so the casing that
//! becomes canonical is decided by ingestion order.

pub mod canonical;
pub mod concept;
pub mod extraction;
pub mod graph;
pub mod query;
pub mod relation;
pub mod shared;
pub mod source_index;

pub use canonical::{Canonicalizer, SynonymTable};
pub use concept::{Concept, ConceptStore, ConceptType};
pub use extraction::{
    ConceptCandidate, DocumentExtraction, Extraction, ExtractionOutcome, RelationCandidate,
};
pub use graph::{IngestReport, KnowledgeGraph, RebuildReport};
pub use query::{
    ConceptInfo, DEFAULT_RELATED_LIMIT, ExportEdge, ExportNode, GraphExport, GraphStats,
    RelatedConcept, RelatedDocument,
};
pub use relation::{Relation, RelationStore, RelationType, RelationUpsert};
pub use shared::SharedGraph;
pub use source_index::SourceIndex;
