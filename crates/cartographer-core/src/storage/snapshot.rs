//! Serialized form of a knowledge graph
//!
//! Set-valued fields are written as ascending lists so that saving the same
//! graph twice produces the same document apart from `saved_at`. Category
//! strings are kept as plain strings on the wire and coerced on load, the
//! same way extractor output is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::knowledge::canonical::Canonicalizer;
use crate::knowledge::concept::{Concept, ConceptStore, ConceptType};
use crate::knowledge::extraction::{DEFAULT_SCORE, clamp_score};
use crate::knowledge::graph::KnowledgeGraph;
use crate::knowledge::relation::{Relation, RelationStore, RelationType};
use crate::knowledge::source_index::SourceIndex;

/// Current on-disk schema version
///
/// Version 0 is the untagged layout: same sections, no `version` field.
pub const SCHEMA_VERSION: u32 = 1;

/// Whole-graph record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub concepts: BTreeMap<String, ConceptRecord>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
    /// Document id -> canonical names in extraction order
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<String>>,
}

/// Concept record, keyed by canonical name in [`GraphSnapshot::concepts`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    /// Redundant with the map key; the key wins when they disagree
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub concept_type: String,
    #[serde(default = "default_score")]
    pub importance: f64,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Relation record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub from: String,
    pub to: String,
    #[serde(rename = "type", default)]
    pub relation_type: String,
    #[serde(default = "default_score")]
    pub strength: f64,
    #[serde(default)]
    pub sources: Vec<String>,
}

fn default_score() -> f64 {
    DEFAULT_SCORE
}

impl GraphSnapshot {
    /// Capture the full graph state, stamped with the current schema version
    pub fn from_graph(graph: &KnowledgeGraph) -> Self {
        let concepts = graph
            .concepts()
            .iter()
            .map(|concept| {
                let record = ConceptRecord {
                    name: concept.name.clone(),
                    concept_type: concept.concept_type.as_str().to_string(),
                    importance: concept.importance,
                    parent: concept.parent.clone(),
                    sources: concept.sources.iter().cloned().collect(),
                    aliases: concept.aliases.iter().cloned().collect(),
                };
                (concept.name.clone(), record)
            })
            .collect();

        let relations = graph
            .relations()
            .iter()
            .map(|relation| RelationRecord {
                from: relation.from.clone(),
                to: relation.to.clone(),
                relation_type: relation.relation_type.as_str().to_string(),
                strength: relation.strength,
                sources: relation.sources.iter().cloned().collect(),
            })
            .collect();

        let sources = graph
            .sources()
            .iter()
            .map(|(id, names)| (id.to_string(), names.to_vec()))
            .collect();

        Self {
            version: SCHEMA_VERSION,
            saved_at: Some(Utc::now()),
            concepts,
            relations,
            sources,
        }
    }

    /// Rebuild the in-memory graph
    ///
    /// Unknown categories are coerced, scores clamped, duplicate relation
    /// triples merged, and relations whose endpoints are not concepts
    /// dropped, so a loaded graph satisfies the same invariants as one built
    /// by ingestion.
    pub fn into_graph(self, canonicalizer: Canonicalizer) -> KnowledgeGraph {
        let mut concepts = ConceptStore::new();
        for (key, record) in self.concepts {
            concepts.insert(Concept {
                concept_type: ConceptType::coerce(&record.concept_type),
                importance: clamp_score(record.importance),
                parent: record.parent.filter(|p| !p.trim().is_empty()),
                sources: record.sources.into_iter().collect(),
                aliases: record.aliases.into_iter().collect(),
                name: key,
            });
        }

        let mut relations = RelationStore::new();
        for record in self.relations {
            if !concepts.contains(&record.from) || !concepts.contains(&record.to) {
                warn!(
                    from = %record.from,
                    to = %record.to,
                    "Dropping stored relation with unknown endpoint"
                );
                continue;
            }
            relations.insert(Relation {
                from: record.from,
                to: record.to,
                relation_type: RelationType::coerce(&record.relation_type),
                strength: clamp_score(record.strength),
                sources: record.sources.into_iter().collect(),
            });
        }

        let mut sources = SourceIndex::new();
        for (document_id, names) in self.sources {
            sources.set(document_id, names);
        }

        KnowledgeGraph::from_parts(canonicalizer, concepts, relations, sources)
    }
}
