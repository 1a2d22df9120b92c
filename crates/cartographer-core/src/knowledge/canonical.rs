//! Canonical identity resolution
//!
//! Every raw surface form an extractor produces ("python3", "PYTHON",
//! "  Python ") is resolved to one canonical concept name before it touches
//! the stores. Resolution order:
//!
//! 1. Case-insensitive lookup in the [`SynonymTable`].
//! 2. Case-insensitive match against names already in the [`ConceptStore`];
//!    the first casing ever stored wins.
//! 3. Otherwise the trimmed input becomes a new canonical name.
//!
//! Step 2 depends on store state, so the result for a given raw string can
//! change as the graph grows, and ingestion order decides which casing
//! becomes canonical. Callers that need reproducible names must fix the
//! order in which documents are ingested.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

use super::concept::ConceptStore;

/// Synonyms shipped with the binary: `(alias, canonical)`.
const BUILTIN_SYNONYMS: &[(&str, &str)] = &[
    ("python 3", "Python"),
    ("python3", "Python"),
    ("py", "Python"),
    ("machine learning", "Machine Learning"),
    ("ml", "Machine Learning"),
    ("deep learning", "Deep Learning"),
    ("dl", "Deep Learning"),
    ("neural network", "Neural Network"),
    ("neural networks", "Neural Network"),
    ("redes neuronales", "Neural Network"),
    ("git", "Git"),
    ("github", "GitHub"),
    ("ia", "Artificial Intelligence"),
    ("ai", "Artificial Intelligence"),
    ("inteligencia artificial", "Artificial Intelligence"),
    ("llm", "LLM"),
    ("llms", "LLM"),
    ("large language model", "LLM"),
    ("claude", "Claude"),
    ("claude code", "Claude Code"),
    ("mcp", "MCP"),
    ("model context protocol", "MCP"),
];

/// Fixed alias table mapping lowercase surface forms to canonical names
///
/// Each canonical target also resolves to itself, so `"PYTHON"` maps to
/// `"Python"` even when no explicit alias says so. Explicit aliases take
/// precedence over these implicit self-mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynonymTable {
    entries: HashMap<String, String>,
}

/// On-disk synonym file
///
/// ```toml
/// replace_builtin = false
///
/// [synonyms]
/// "rustlang" = "Rust"
/// "k8s" = "Kubernetes"
/// ```
#[derive(Debug, Deserialize)]
struct SynonymFile {
    #[serde(default)]
    replace_builtin: bool,
    #[serde(default)]
    synonyms: BTreeMap<String, String>,
}

impl SynonymTable {
    /// An empty table: canonicalization falls through to store folding
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build a table from `(alias, canonical)` pairs
    pub fn from_pairs<I, A, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, C)>,
        A: AsRef<str>,
        C: AsRef<str>,
    {
        let mut table = Self::empty();
        for (alias, canonical) in pairs {
            table.insert(alias.as_ref(), canonical.as_ref());
        }
        table
    }

    /// Parse a TOML synonym file; entries extend the built-in table unless
    /// `replace_builtin = true`
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: SynonymFile = toml::from_str(contents)
            .map_err(|e| Error::SynonymTable(format!("invalid synonym file: {}", e)))?;

        let mut table = if file.replace_builtin {
            Self::empty()
        } else {
            Self::default()
        };

        for (alias, canonical) in &file.synonyms {
            if alias.trim().is_empty() || canonical.trim().is_empty() {
                return Err(Error::SynonymTable(format!(
                    "empty alias or canonical name in entry '{}' = '{}'",
                    alias, canonical
                )));
            }
            table.insert(alias, canonical);
        }

        table.check_targets_resolve_to_themselves()?;
        Ok(table)
    }

    /// Every canonical target must look itself up, otherwise a stored name
    /// would resolve to some other concept on its next pass
    fn check_targets_resolve_to_themselves(&self) -> Result<()> {
        let entries: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|(alias, canonical)| (alias.as_str(), canonical.as_str()))
            .collect();

        for (alias, canonical) in &entries {
            let resolved = self.lookup(canonical).unwrap_or("nothing");
            if resolved != *canonical {
                return Err(Error::SynonymTable(format!(
                    "'{alias}' maps to '{canonical}', but '{canonical}' maps to '{resolved}'"
                )));
            }
        }
        Ok(())
    }

    /// Load a TOML synonym file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::SynonymTable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let table = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), entries = table.len(), "Loaded synonym table");
        Ok(table)
    }

    /// Register an alias; the canonical name is registered as its own alias
    /// when nothing else claims it yet
    pub fn insert(&mut self, alias: &str, canonical: &str) {
        let canonical = canonical.trim().to_string();
        self.entries.insert(alias.trim().to_lowercase(), canonical.clone());
        self.entries.entry(canonical.to_lowercase()).or_insert(canonical);
    }

    /// Look up a raw name, ignoring case and surrounding whitespace
    pub fn lookup(&self, raw: &str) -> Option<&str> {
        self.entries.get(&raw.trim().to_lowercase()).map(String::as_str)
    }

    /// Number of surface forms the table resolves
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SynonymTable {
    fn default() -> Self {
        Self::from_pairs(BUILTIN_SYNONYMS.iter().copied())
    }
}

/// Resolves raw surface forms to canonical concept names
///
/// Cheap to clone: the synonym table is shared.
#[derive(Debug, Clone, Default)]
pub struct Canonicalizer {
    synonyms: Arc<SynonymTable>,
}

impl Canonicalizer {
    /// Create a canonicalizer over the given synonym table
    pub fn new(synonyms: SynonymTable) -> Self {
        Self {
            synonyms: Arc::new(synonyms),
        }
    }

    /// The synonym table in use
    pub fn synonyms(&self) -> &SynonymTable {
        &self.synonyms
    }

    /// Resolve `raw` against the synonym table, then against `concepts`
    ///
    /// Idempotent: `canonicalize(canonicalize(x)) == canonicalize(x)` for a
    /// fixed store state.
    pub fn canonicalize(&self, raw: &str, concepts: &ConceptStore) -> String {
        let trimmed = raw.trim();

        if let Some(canonical) = self.synonyms.lookup(trimmed) {
            return canonical.to_string();
        }

        if let Some(existing) = concepts.find_case_insensitive(trimmed) {
            return existing.to_string();
        }

        trimmed.to_string()
    }
}
