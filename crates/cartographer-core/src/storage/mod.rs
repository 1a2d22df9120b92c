//! Storage layer - JSON graph file and extraction batches
//!
//! # Architecture
//!
//! - `snapshot`: serialized graph record and schema versioning
//! - `graph_file`: load/save of one graph file with atomic replacement
//! - `extractions`: per-document extractor output read from a directory
//!
//! # Usage
//!
//! ```ignore
//! use cartographer_core::knowledge::Canonicalizer;
//! use cartographer_core::storage::GraphFile;
//!
//! let file = GraphFile::new("graph.json");
//! let mut graph = file.load(Canonicalizer::default())?;
//! graph.ingest_document("video-1", &extraction);
//! file.save(&graph)?;
//! ```

pub mod extractions;
pub mod graph_file;
pub mod snapshot;

pub use extractions::load_extraction_dir;
pub use graph_file::GraphFile;
pub use snapshot::{ConceptRecord, GraphSnapshot, RelationRecord, SCHEMA_VERSION};
