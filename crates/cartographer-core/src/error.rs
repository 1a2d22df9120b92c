//! Error types for Cartographer

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using Cartographer's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Cartographer error types with helpful messages and suggestions
///
/// Lookups of unknown documents or concepts are not errors: queries return
/// `None` or an empty list. Out-of-range scores, unknown categories, and
/// relations pointing at missing concepts are absorbed during ingestion.
#[derive(Error, Debug)]
pub enum Error {
    // Lock errors (E300-E399)
    #[error("Lock timeout: {0} is held by another writer. Try again later.")]
    LockTimeout(String),

    // Storage errors (E400-E499)
    #[error("Graph file '{}' is corrupt: {reason}", path.display())]
    StorageCorrupt { path: PathBuf, reason: String },

    #[error(
        "Graph file '{}' uses schema version {found}, but this build only understands up to {supported}.",
        path.display()
    )]
    UnsupportedSchemaVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    // Config errors (E600-E699)
    #[error("Synonym table error: {0}")]
    SynonymTable(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Input errors (E800-E899)
    #[error("Extraction could not be parsed: {0}")]
    ExtractionParse(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockTimeout(_) => "E300",
            Self::StorageCorrupt { .. } => "E400",
            Self::UnsupportedSchemaVersion { .. } => "E401",
            Self::SynonymTable(_) => "E600",
            Self::ConfigError(_) => "E601",
            Self::ExtractionParse(_) => "E800",
            Self::InvalidInput(_) => "E801",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::StorageCorrupt { .. } => {
                Some("cartographer rebuild <extractions-dir>".to_string())
            }
            Self::UnsupportedSchemaVersion { .. } => {
                Some("Upgrade cartographer to read this graph file".to_string())
            }
            Self::SynonymTable(_) => {
                Some("cartographer config get canonicalization.synonyms_path".to_string())
            }
            Self::ConfigError(_) => Some("cartographer config reset".to_string()),
            _ => None,
        }
    }
}
