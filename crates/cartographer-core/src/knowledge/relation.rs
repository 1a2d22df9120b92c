//! Relation edges and their deduplication policy
//!
//! An edge is identified by `(from, to, type)`. Direction and type both
//! matter: `(A, B, usa)`, `(B, A, usa)` and `(A, B, requiere)` are three
//! different edges. Repeated assertions of the same triple merge: strength
//! takes the maximum and provenance grows.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::canonical::Canonicalizer;
use super::concept::ConceptStore;
use super::extraction::RelationCandidate;

/// Closed set of relation categories
///
/// Unknown labels are coerced to [`RelationType::RelatedTo`] at the
/// ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RelationType {
    /// Source is part of target
    #[serde(rename = "es_parte_de")]
    PartOf,
    /// Source uses target
    #[serde(rename = "usa")]
    Uses,
    /// Source requires target
    #[serde(rename = "requiere")]
    Requires,
    /// Generic relation
    #[default]
    #[serde(rename = "relacionado")]
    RelatedTo,
    /// Source is an alternative to target
    #[serde(rename = "alternativa")]
    AlternativeTo,
    /// Source implements target
    #[serde(rename = "implementa")]
    Implements,
}

impl RelationType {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PartOf => "es_parte_de",
            Self::Uses => "usa",
            Self::Requires => "requiere",
            Self::RelatedTo => "relacionado",
            Self::AlternativeTo => "alternativa",
            Self::Implements => "implementa",
        }
    }

    /// Parse from string (case-insensitive, English names accepted)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "es_parte_de" | "part_of" => Some(Self::PartOf),
            "usa" | "uses" => Some(Self::Uses),
            "requiere" | "requires" => Some(Self::Requires),
            "relacionado" | "related_to" => Some(Self::RelatedTo),
            "alternativa" | "alternative_to" => Some(Self::AlternativeTo),
            "implementa" | "implements" => Some(Self::Implements),
            _ => None,
        }
    }

    /// Parse, falling back to the default category
    pub fn coerce(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed, weighted edge between two canonical concepts
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Canonical name of the source concept
    pub from: String,
    /// Canonical name of the target concept
    pub to: String,
    pub relation_type: RelationType,
    /// Highest strength any assertion reported, in [0, 1]
    pub strength: f64,
    /// Documents asserting this relation
    pub sources: BTreeSet<String>,
}

impl Relation {
    fn key(&self) -> RelationKey {
        RelationKey {
            from: self.from.clone(),
            to: self.to.clone(),
            relation_type: self.relation_type,
        }
    }

    /// Merge another assertion of the same triple
    fn absorb(&mut self, strength: f64, sources: impl IntoIterator<Item = String>) {
        self.strength = self.strength.max(strength);
        self.sources.extend(sources);
    }

    /// The endpoint opposite `name`, if this edge touches it
    pub fn other_endpoint(&self, name: &str) -> Option<&str> {
        if self.from == name {
            Some(&self.to)
        } else if self.to == name {
            Some(&self.from)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RelationKey {
    from: String,
    to: String,
    relation_type: RelationType,
}

/// Outcome of [`RelationStore::upsert`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationUpsert {
    /// A new edge was appended
    Created,
    /// An existing edge absorbed the assertion
    Merged,
    /// An endpoint is not a known concept; nothing changed
    Dropped,
}

/// Edges in insertion order, indexed by triple
#[derive(Debug, Clone, Default)]
pub struct RelationStore {
    relations: Vec<Relation>,
    index: HashMap<RelationKey, usize>,
}

impl RelationStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or merge an assertion made by `document_id`
    ///
    /// Both endpoints are canonicalized against `concepts`. If either one is
    /// not already a concept, the assertion is dropped silently.
    pub fn upsert(
        &mut self,
        canonicalizer: &Canonicalizer,
        concepts: &ConceptStore,
        candidate: &RelationCandidate,
        document_id: &str,
    ) -> RelationUpsert {
        let from = canonicalizer.canonicalize(&candidate.from, concepts);
        let to = canonicalizer.canonicalize(&candidate.to, concepts);

        if !concepts.contains(&from) || !concepts.contains(&to) {
            debug!(
                from = %from,
                to = %to,
                relation_type = %candidate.relation_type,
                document_id = %document_id,
                "Dropped relation with unknown endpoint"
            );
            return RelationUpsert::Dropped;
        }

        let relation = Relation {
            from,
            to,
            relation_type: candidate.relation_type,
            strength: candidate.strength,
            sources: BTreeSet::from([document_id.to_string()]),
        };
        self.insert(relation)
    }

    /// Insert a fully formed edge, merging it into an existing triple
    pub(crate) fn insert(&mut self, relation: Relation) -> RelationUpsert {
        let key = relation.key();

        if let Some(&position) = self.index.get(&key) {
            let existing = &mut self.relations[position];
            existing.absorb(relation.strength, relation.sources);
            debug!(
                from = %existing.from,
                to = %existing.to,
                relation_type = %existing.relation_type,
                strength = existing.strength,
                "Merged relation"
            );
            RelationUpsert::Merged
        } else {
            self.index.insert(key, self.relations.len());
            self.relations.push(relation);
            RelationUpsert::Created
        }
    }

    /// Look up the edge for an exact triple
    pub fn get(&self, from: &str, to: &str, relation_type: RelationType) -> Option<&Relation> {
        let key = RelationKey {
            from: from.to_string(),
            to: to.to_string(),
            relation_type,
        };
        self.index.get(&key).map(|&position| &self.relations[position])
    }

    /// Edges where `name` is either endpoint, in insertion order
    pub fn involving<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Relation> + 'a {
        self.relations
            .iter()
            .filter(move |relation| relation.from == name || relation.to == name)
    }

    /// Iterate edges in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Relation> {
        self.relations.iter()
    }

    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    pub fn clear(&mut self) {
        self.relations.clear();
        self.index.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::concept::ConceptType;
    use crate::knowledge::extraction::ConceptCandidate;

    fn setup(names: &[&str]) -> (Canonicalizer, ConceptStore) {
        let canonicalizer = Canonicalizer::default();
        let mut concepts = ConceptStore::new();
        for name in names {
            concepts.upsert(
                &canonicalizer,
                &ConceptCandidate::new(*name, ConceptType::Concept),
                "seed",
            );
        }
        (canonicalizer, concepts)
    }

    fn edge(from: &str, to: &str, relation_type: RelationType, strength: f64) -> RelationCandidate {
        RelationCandidate::new(from, to, relation_type).with_strength(strength)
    }

    #[test]
    fn test_relation_type_parsing() {
        assert_eq!(RelationType::parse("usa"), Some(RelationType::Uses));
        assert_eq!(RelationType::parse("REQUIERE"), Some(RelationType::Requires));
        assert_eq!(RelationType::parse("part_of"), Some(RelationType::PartOf));
        assert_eq!(RelationType::parse("inspires"), None);
        assert_eq!(RelationType::coerce("inspires"), RelationType::RelatedTo);
    }

    #[test]
    fn test_duplicate_triple_merges() {
        let (canonicalizer, concepts) = setup(&["Flask", "Python"]);
        let mut store = RelationStore::new();

        let first = store.upsert(
            &canonicalizer,
            &concepts,
            &edge("Flask", "Python", RelationType::Uses, 0.5),
            "doc1",
        );
        let second = store.upsert(
            &canonicalizer,
            &concepts,
            &edge("Flask", "Python", RelationType::Uses, 0.8),
            "doc2",
        );

        assert_eq!(first, RelationUpsert::Created);
        assert_eq!(second, RelationUpsert::Merged);
        assert_eq!(store.len(), 1);

        let relation = store.get("Flask", "Python", RelationType::Uses).unwrap();
        assert_eq!(relation.strength, 0.8);
        assert_eq!(
            relation.sources,
            BTreeSet::from(["doc1".to_string(), "doc2".to_string()])
        );
    }

    #[test]
    fn test_strength_never_decreases() {
        let (canonicalizer, concepts) = setup(&["A", "B"]);
        let mut store = RelationStore::new();

        store.upsert(&canonicalizer, &concepts, &edge("A", "B", RelationType::Uses, 0.9), "doc1");
        store.upsert(&canonicalizer, &concepts, &edge("A", "B", RelationType::Uses, 0.1), "doc2");

        assert_eq!(store.get("A", "B", RelationType::Uses).unwrap().strength, 0.9);
    }

    #[test]
    fn test_direction_and_type_are_distinct() {
        let (canonicalizer, concepts) = setup(&["A", "B"]);
        let mut store = RelationStore::new();

        store.upsert(&canonicalizer, &concepts, &edge("A", "B", RelationType::Uses, 0.5), "doc1");
        store.upsert(&canonicalizer, &concepts, &edge("B", "A", RelationType::Uses, 0.5), "doc1");
        store.upsert(
            &canonicalizer,
            &concepts,
            &edge("A", "B", RelationType::Requires, 0.5),
            "doc1",
        );

        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_dangling_relation_is_dropped() {
        let (canonicalizer, concepts) = setup(&["Python"]);
        let mut store = RelationStore::new();

        let outcome = store.upsert(
            &canonicalizer,
            &concepts,
            &edge("Python", "Flask", RelationType::Uses, 0.6),
            "doc1",
        );

        assert_eq!(outcome, RelationUpsert::Dropped);
        assert!(store.is_empty());
    }

    #[test]
    fn test_endpoints_are_canonicalized() {
        let (canonicalizer, concepts) = setup(&["Python", "Machine Learning"]);
        let mut store = RelationStore::new();

        store.upsert(
            &canonicalizer,
            &concepts,
            &edge("python3", "ml", RelationType::Uses, 0.7),
            "doc1",
        );

        assert!(store.get("Python", "Machine Learning", RelationType::Uses).is_some());
    }

    #[test]
    fn test_involving_and_other_endpoint() {
        let (canonicalizer, concepts) = setup(&["A", "B", "C"]);
        let mut store = RelationStore::new();
        store.upsert(&canonicalizer, &concepts, &edge("A", "B", RelationType::Uses, 0.5), "doc1");
        store.upsert(&canonicalizer, &concepts, &edge("C", "A", RelationType::PartOf, 0.5), "doc1");
        store.upsert(&canonicalizer, &concepts, &edge("B", "C", RelationType::Uses, 0.5), "doc1");

        let others: Vec<&str> = store
            .involving("A")
            .filter_map(|relation| relation.other_endpoint("A"))
            .collect();
        assert_eq!(others, vec!["B", "C"]);
    }
}
