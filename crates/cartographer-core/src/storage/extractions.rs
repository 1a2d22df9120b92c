//! Directory of per-document extraction files
//!
//! Each `*.json` file holds one document's extractor output; the file stem
//! is the document id. Files are returned in file-name order so a rebuild
//! over the same directory always ingests in the same order.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::knowledge::extraction::{DocumentExtraction, Extraction};

/// Read every extraction file in `dir`
///
/// A file that cannot be read or parsed becomes a failed document rather
/// than an error. Only an unreadable directory fails the call.
pub fn load_extraction_dir(dir: &Path) -> Result<Vec<DocumentExtraction>> {
    if !dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "extractions directory '{}' does not exist",
            dir.display()
        )));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(Error::Io)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let documents: Vec<DocumentExtraction> = paths
        .iter()
        .filter_map(|path| {
            let document_id = path.file_stem()?.to_string_lossy().into_owned();
            Some(load_extraction_file(document_id, path))
        })
        .collect();

    debug!(
        dir = %dir.display(),
        documents = documents.len(),
        failed = documents.iter().filter(|d| d.is_failed()).count(),
        "Loaded extraction directory"
    );

    Ok(documents)
}

fn load_extraction_file(document_id: String, path: &Path) -> DocumentExtraction {
    let parsed = fs::read_to_string(path)
        .map_err(Error::Io)
        .and_then(|contents| Extraction::parse_response(&contents));

    match parsed {
        Ok(extraction) => DocumentExtraction::extracted(document_id, extraction),
        Err(e) => {
            warn!(
                document_id = %document_id,
                path = %path.display(),
                error = %e,
                "Unusable extraction file"
            );
            DocumentExtraction::failed(document_id, e.to_string())
        }
    }
}
