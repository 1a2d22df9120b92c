//! Knowledge graph and ingestion orchestration
//!
//! [`KnowledgeGraph`] owns the three stores and the canonicalizer and is the
//! only writer to them. Ingestion is synchronous in-memory work; the only
//! I/O happens in [`KnowledgeGraph::load`], [`KnowledgeGraph::save`] and
//! [`KnowledgeGraph::rebuild_all`].

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::Result;
use crate::storage::GraphFile;

use super::canonical::Canonicalizer;
use super::concept::ConceptStore;
use super::extraction::{DocumentExtraction, Extraction, ExtractionOutcome};
use super::query::GraphStats;
use super::relation::{RelationStore, RelationUpsert};
use super::source_index::SourceIndex;

/// Cross-document knowledge graph
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    canonicalizer: Canonicalizer,
    concepts: ConceptStore,
    relations: RelationStore,
    sources: SourceIndex,
}

impl KnowledgeGraph {
    /// Create an empty graph resolving names with `canonicalizer`
    pub fn new(canonicalizer: Canonicalizer) -> Self {
        Self {
            canonicalizer,
            ..Self::default()
        }
    }

    pub(crate) fn from_parts(
        canonicalizer: Canonicalizer,
        concepts: ConceptStore,
        relations: RelationStore,
        sources: SourceIndex,
    ) -> Self {
        Self {
            canonicalizer,
            concepts,
            relations,
            sources,
        }
    }

    /// Load a graph from `path`; a missing file yields an empty graph
    pub fn load(path: impl AsRef<Path>, canonicalizer: Canonicalizer) -> Result<Self> {
        GraphFile::new(path.as_ref()).load(canonicalizer)
    }

    /// Overwrite `path` with the full graph
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        GraphFile::new(path.as_ref()).save(self)
    }

    pub fn canonicalizer(&self) -> &Canonicalizer {
        &self.canonicalizer
    }

    pub fn concepts(&self) -> &ConceptStore {
        &self.concepts
    }

    pub fn relations(&self) -> &RelationStore {
        &self.relations
    }

    pub fn sources(&self) -> &SourceIndex {
        &self.sources
    }

    /// Resolve a raw name against the current graph state
    pub fn canonicalize(&self, raw: &str) -> String {
        self.canonicalizer.canonicalize(raw, &self.concepts)
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.relations.is_empty() && self.sources.is_empty()
    }

    // ========== Ingestion ==========

    /// Merge one document's extraction into the graph
    ///
    /// Concepts are upserted first, in input order, so relations in the same
    /// extraction can point at them. The document's source index entry is
    /// replaced, not extended: ingesting the same id twice leaves the index
    /// as if it were ingested once.
    pub fn ingest_document(&mut self, document_id: &str, extraction: &Extraction) -> IngestReport {
        let mut report = IngestReport::new(document_id);
        let mut mentioned = Vec::with_capacity(extraction.concepts.len());

        for candidate in &extraction.concepts {
            if candidate.name.trim().is_empty() {
                warn!(document_id = %document_id, "Skipping concept with empty name");
                report.concepts_skipped += 1;
                continue;
            }

            let before = self.concepts.len();
            let canonical = self
                .concepts
                .upsert(&self.canonicalizer, candidate, document_id);
            if self.concepts.len() > before {
                report.concepts_created += 1;
            } else {
                report.concepts_merged += 1;
            }
            mentioned.push(canonical);
        }

        for candidate in &extraction.relations {
            match self.relations.upsert(
                &self.canonicalizer,
                &self.concepts,
                candidate,
                document_id,
            ) {
                RelationUpsert::Created => report.relations_created += 1,
                RelationUpsert::Merged => report.relations_merged += 1,
                RelationUpsert::Dropped => {}
            }
        }

        self.sources.set(document_id, mentioned);

        info!(
            document_id = %document_id,
            concepts_created = report.concepts_created,
            concepts_merged = report.concepts_merged,
            relations_created = report.relations_created,
            relations_merged = report.relations_merged,
            "Ingested document"
        );

        report
    }

    /// Discard all graph state
    pub fn clear(&mut self) {
        self.concepts.clear();
        self.relations.clear();
        self.sources.clear();
    }

    /// Clear the graph and re-ingest every document in the given order
    ///
    /// A failed extraction never blocks the rest of the batch: the document
    /// is ingested as empty (so it stays indexed) and reported.
    pub fn rebuild(&mut self, documents: &[DocumentExtraction]) -> RebuildReport {
        self.clear();

        let empty = Extraction::empty();
        let mut failed_documents = Vec::new();

        for document in documents {
            let extraction = match &document.outcome {
                ExtractionOutcome::Extracted(extraction) => extraction,
                ExtractionOutcome::Failed(reason) => {
                    warn!(
                        document_id = %document.document_id,
                        reason = %reason,
                        "Extraction failed, indexing document without concepts"
                    );
                    failed_documents.push(document.document_id.clone());
                    &empty
                }
            };
            self.ingest_document(&document.document_id, extraction);
        }

        let report = RebuildReport {
            documents_ingested: documents.len(),
            failed_documents,
            stats: self.stats(),
        };

        info!(
            documents = report.documents_ingested,
            failed = report.failed_documents.len(),
            concepts = report.stats.concepts,
            relations = report.stats.relations,
            "Rebuilt knowledge graph"
        );

        report
    }

    /// Rebuild from scratch and persist the result to `file`
    pub fn rebuild_all(
        &mut self,
        documents: &[DocumentExtraction],
        file: &GraphFile,
    ) -> Result<RebuildReport> {
        let report = self.rebuild(documents);
        file.save(self)?;
        Ok(report)
    }
}

/// Outcome of ingesting one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub document_id: String,
    /// Concepts seen for the first time
    pub concepts_created: usize,
    /// Mentions folded into an existing concept
    pub concepts_merged: usize,
    /// Candidates without a usable name
    pub concepts_skipped: usize,
    pub relations_created: usize,
    pub relations_merged: usize,
}

impl IngestReport {
    fn new(document_id: &str) -> Self {
        Self {
            document_id: document_id.to_string(),
            ..Self::default()
        }
    }

    /// Concept mentions that reached the store
    pub fn total_concepts(&self) -> usize {
        self.concepts_created + self.concepts_merged
    }
}

/// Outcome of a full rebuild
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
    pub documents_ingested: usize,
    /// Documents whose extraction failed and were indexed empty
    pub failed_documents: Vec<String>,
    pub stats: GraphStats,
}
