//! JSON file holding one persisted knowledge graph

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::knowledge::canonical::Canonicalizer;
use crate::knowledge::graph::KnowledgeGraph;

use super::snapshot::{GraphSnapshot, SCHEMA_VERSION};

/// Location of a persisted graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphFile {
    path: PathBuf,
}

impl GraphFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the graph
    ///
    /// A missing file is a fresh, empty graph. A file that exists but does
    /// not parse, or was written by a newer schema, is an error; nothing is
    /// partially recovered.
    pub fn load(&self, canonicalizer: Canonicalizer) -> Result<KnowledgeGraph> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No graph file, starting empty");
                return Ok(KnowledgeGraph::new(canonicalizer));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let snapshot: GraphSnapshot =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::StorageCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if snapshot.version > SCHEMA_VERSION {
            return Err(Error::UnsupportedSchemaVersion {
                path: self.path.clone(),
                found: snapshot.version,
                supported: SCHEMA_VERSION,
            });
        }

        let version = snapshot.version;
        let graph = snapshot.into_graph(canonicalizer);
        let stats = graph.stats();

        info!(
            path = %self.path.display(),
            version,
            concepts = stats.concepts,
            relations = stats.relations,
            documents = stats.documents,
            "Loaded knowledge graph"
        );

        Ok(graph)
    }

    /// Overwrite the file with the full graph
    ///
    /// Writes a sibling temp file, syncs it, then renames it over the
    /// target, so the previous file is never left half written.
    pub fn save(&self, graph: &KnowledgeGraph) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        let snapshot = GraphSnapshot::from_graph(graph);
        let tmp_path = self.tmp_path();

        let written = write_snapshot(&tmp_path, &snapshot)
            .and_then(|()| fs::rename(&tmp_path, &self.path).map_err(Error::Io));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        info!(
            path = %self.path.display(),
            concepts = snapshot.concepts.len(),
            relations = snapshot.relations.len(),
            documents = snapshot.sources.len(),
            "Saved knowledge graph"
        );

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "graph.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn write_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    let file = File::create(path).map_err(Error::Io)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, snapshot)
        .map_err(|e| Error::Other(format!("Failed to serialize graph: {}", e)))?;
    writer.write_all(b"\n").map_err(Error::Io)?;
    writer.flush().map_err(Error::Io)?;

    let file = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    file.sync_all().map_err(Error::Io)
}
