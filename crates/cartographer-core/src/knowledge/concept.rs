//! Concept nodes and their merge policy
//!
//! A concept is keyed by its canonical name. Repeated mentions across
//! documents merge monotonically: importance only rises, provenance and
//! aliases only grow. Category and parent are fixed by the first mention.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::canonical::Canonicalizer;
use super::extraction::ConceptCandidate;

/// Closed set of concept categories
///
/// Wire names are the category labels extractors emit. Unknown labels are
/// coerced to [`ConceptType::Concept`] at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConceptType {
    /// Programming language (e.g., "Python", "Rust")
    #[serde(rename = "lenguaje")]
    Language,
    /// Software library (e.g., "pandas", "serde")
    #[serde(rename = "libreria")]
    Library,
    /// Framework (e.g., "Django", "axum")
    #[serde(rename = "framework")]
    Framework,
    /// Development tool (e.g., "Git", "Docker")
    #[serde(rename = "herramienta")]
    Tool,
    /// Abstract idea (e.g., "Machine Learning")
    #[default]
    #[serde(rename = "concepto")]
    Concept,
    /// Methodology or practice (e.g., "TDD")
    #[serde(rename = "metodologia")]
    Methodology,
    /// Design pattern (e.g., "Observer")
    #[serde(rename = "patron")]
    Pattern,
}

impl ConceptType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Language => "lenguaje",
            Self::Library => "libreria",
            Self::Framework => "framework",
            Self::Tool => "herramienta",
            Self::Concept => "concepto",
            Self::Methodology => "metodologia",
            Self::Pattern => "patron",
        }
    }

    /// Parse from string (case-insensitive, English names accepted)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "lenguaje" | "language" => Some(Self::Language),
            "libreria" | "librería" | "library" => Some(Self::Library),
            "framework" => Some(Self::Framework),
            "herramienta" | "tool" => Some(Self::Tool),
            "concepto" | "concept" => Some(Self::Concept),
            "metodologia" | "metodología" | "methodology" => Some(Self::Methodology),
            "patron" | "patrón" | "pattern" => Some(Self::Pattern),
            _ => None,
        }
    }

    /// Parse, falling back to the default category
    pub fn coerce(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for ConceptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A canonical concept with its provenance
#[derive(Debug, Clone, PartialEq)]
pub struct Concept {
    /// Canonical name (store key)
    pub name: String,
    /// Category assigned by the first mention
    pub concept_type: ConceptType,
    /// Highest importance any mention reported, in [0, 1]
    pub importance: f64,
    /// Parent concept name; never checked for existence
    pub parent: Option<String>,
    /// Documents that mentioned this concept
    pub sources: BTreeSet<String>,
    /// Raw surface forms that resolved here but differ from `name`
    pub aliases: BTreeSet<String>,
}

impl Concept {
    fn from_candidate(name: String, candidate: &ConceptCandidate, document_id: &str) -> Self {
        let raw = candidate.name.trim();
        let mut aliases = BTreeSet::new();
        if raw != name {
            aliases.insert(raw.to_string());
        }

        Self {
            concept_type: candidate.concept_type,
            importance: candidate.importance,
            parent: candidate.parent.clone(),
            sources: BTreeSet::from([document_id.to_string()]),
            aliases,
            name,
        }
    }

    /// Fold another mention into this concept
    ///
    /// `concept_type` and `parent` are left untouched: whether a later,
    /// possibly better extraction should override them is unresolved, so
    /// the first mention stays authoritative.
    fn absorb(&mut self, candidate: &ConceptCandidate, document_id: &str) {
        self.sources.insert(document_id.to_string());
        self.importance = self.importance.max(candidate.importance);

        let raw = candidate.name.trim();
        if raw != self.name {
            self.aliases.insert(raw.to_string());
        }
    }
}

/// Concepts keyed by canonical name
#[derive(Debug, Clone, Default)]
pub struct ConceptStore {
    concepts: BTreeMap<String, Concept>,
    /// Lowercased name -> first canonical casing stored
    folded: HashMap<String, String>,
}

impl ConceptStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge a mention and return the canonical name it resolved to
    ///
    /// Boundary validation (category coercion, importance clamping, dropping
    /// empty names) is expected to have happened already; see
    /// [`ConceptCandidate`].
    pub fn upsert(
        &mut self,
        canonicalizer: &Canonicalizer,
        candidate: &ConceptCandidate,
        document_id: &str,
    ) -> String {
        let canonical = canonicalizer.canonicalize(&candidate.name, self);

        if let Some(existing) = self.concepts.get_mut(&canonical) {
            existing.absorb(candidate, document_id);
            debug!(
                concept = %canonical,
                raw = %candidate.name,
                document_id = %document_id,
                "Merged concept mention"
            );
        } else {
            let concept = Concept::from_candidate(canonical.clone(), candidate, document_id);
            self.insert(concept);
            debug!(
                concept = %canonical,
                concept_type = %candidate.concept_type,
                document_id = %document_id,
                "Created concept"
            );
        }

        canonical
    }

    /// Insert a fully formed concept, replacing any record with the same name
    pub(crate) fn insert(&mut self, concept: Concept) {
        self.folded
            .entry(concept.name.to_lowercase())
            .or_insert_with(|| concept.name.clone());
        self.concepts.insert(concept.name.clone(), concept);
    }

    /// Canonical name stored under the same case-folded spelling, if any
    pub fn find_case_insensitive(&self, name: &str) -> Option<&str> {
        self.folded.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Get a concept by canonical name
    pub fn get(&self, name: &str) -> Option<&Concept> {
        self.concepts.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.concepts.contains_key(name)
    }

    /// Iterate concepts in canonical-name order
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn clear(&mut self) {
        self.concepts.clear();
        self.folded.clear();
    }
}
