//! Snapshot-isolated graph handle for async callers
//!
//! The engine itself has no locking. `SharedGraph` gives a server-style
//! caller what it needs to ingest in the background while serving queries:
//! readers clone an `Arc` to the current graph and never wait on a writer
//! for longer than the pointer swap; writers are serialized, work on a
//! private copy, persist it, and only then publish it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::storage::GraphFile;

use super::canonical::Canonicalizer;
use super::extraction::{DocumentExtraction, Extraction};
use super::graph::{IngestReport, KnowledgeGraph, RebuildReport};

/// Default timeout for graph lock acquisition
const DEFAULT_GRAPH_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Copy-on-write handle over a [`KnowledgeGraph`]
#[derive(Debug)]
pub struct SharedGraph {
    /// Published graph
    current: RwLock<Arc<KnowledgeGraph>>,
    /// Serializes writers
    writer: Mutex<()>,
    /// Where each published graph is saved, if anywhere
    file: Option<GraphFile>,
    lock_timeout: Duration,
}

impl SharedGraph {
    /// Wrap an in-memory graph; nothing is persisted
    pub fn new(graph: KnowledgeGraph) -> Self {
        Self {
            current: RwLock::new(Arc::new(graph)),
            writer: Mutex::new(()),
            file: None,
            lock_timeout: DEFAULT_GRAPH_LOCK_TIMEOUT,
        }
    }

    /// Load the graph from `file` and save every later write back to it
    pub async fn open(file: GraphFile, canonicalizer: Canonicalizer) -> Result<Self> {
        let loader = file.clone();
        let graph = tokio::task::spawn_blocking(move || loader.load(canonicalizer))
            .await
            .map_err(|e| Error::Other(format!("Graph load task failed: {}", e)))??;

        Ok(Self::new(graph).with_file(file))
    }

    /// Persist every published graph to `file`
    pub fn with_file(mut self, file: GraphFile) -> Self {
        self.file = Some(file);
        self
    }

    /// Set the lock acquisition timeout
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    pub fn file(&self) -> Option<&GraphFile> {
        self.file.as_ref()
    }

    /// The current graph; later writes do not affect the returned snapshot
    pub async fn snapshot(&self) -> Result<Arc<KnowledgeGraph>> {
        let guard = tokio::time::timeout(self.lock_timeout, self.current.read())
            .await
            .map_err(|_| Error::LockTimeout("graph snapshot".to_string()))?;
        Ok(Arc::clone(&guard))
    }

    /// Ingest one document and publish the result
    pub async fn ingest_document(
        &self,
        document_id: &str,
        extraction: &Extraction,
    ) -> Result<IngestReport> {
        let _writer = self.acquire_writer("ingest").await?;

        let mut next = KnowledgeGraph::clone(&*self.snapshot().await?);
        let report = next.ingest_document(document_id, extraction);
        self.publish(next).await?;

        Ok(report)
    }

    /// Rebuild from scratch and publish the result
    ///
    /// Readers keep seeing the previous graph until the rebuilt one has been
    /// saved.
    pub async fn rebuild_all(&self, documents: &[DocumentExtraction]) -> Result<RebuildReport> {
        let _writer = self.acquire_writer("rebuild").await?;

        let mut next = KnowledgeGraph::new(self.snapshot().await?.canonicalizer().clone());
        let report = next.rebuild(documents);
        self.publish(next).await?;

        info!(
            documents = report.documents_ingested,
            failed = report.failed_documents.len(),
            "Published rebuilt graph"
        );
        Ok(report)
    }

    async fn acquire_writer(&self, operation: &str) -> Result<MutexGuard<'_, ()>> {
        tokio::time::timeout(self.lock_timeout, self.writer.lock())
            .await
            .map_err(|_| Error::LockTimeout(format!("graph writer ({})", operation)))
    }

    /// Save (when backed by a file), then swap the pointer
    async fn publish(&self, graph: KnowledgeGraph) -> Result<()> {
        let graph = Arc::new(graph);

        if let Some(file) = &self.file {
            let file = file.clone();
            let to_save = Arc::clone(&graph);
            tokio::task::spawn_blocking(move || file.save(&to_save))
                .await
                .map_err(|e| Error::Other(format!("Graph save task failed: {}", e)))??;
        }

        let mut current = tokio::time::timeout(self.lock_timeout, self.current.write())
            .await
            .map_err(|_| Error::LockTimeout("graph publish".to_string()))?;
        *current = graph;
        debug!("Published graph snapshot");

        Ok(())
    }
}
