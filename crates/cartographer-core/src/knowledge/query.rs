//! Read-only queries over the knowledge graph
//!
//! Nothing here mutates the stores. Scores are computed from live concept
//! importance on every call, so results shift as the graph grows.

use serde::Serialize;

use super::concept::ConceptType;
use super::graph::KnowledgeGraph;
use super::relation::RelationType;

/// Number of related documents returned when no limit is given
pub const DEFAULT_RELATED_LIMIT: usize = 10;

/// A document that shares concepts with the queried one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedDocument {
    pub document_id: String,
    /// Shared canonical names, sorted
    pub shared_concepts: Vec<String>,
    /// Sum of the shared concepts' importance
    pub score: f64,
}

/// Everything known about one concept
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConceptInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub concept_type: ConceptType,
    pub importance: f64,
    pub aliases: Vec<String>,
    pub sources: Vec<String>,
    pub parent: Option<String>,
    /// Edges touching the concept, incoming and outgoing alike
    pub related: Vec<RelatedConcept>,
}

/// The far end of an edge touching a queried concept
///
/// Carries no direction: the queried concept may be either endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelatedConcept {
    pub name: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub strength: f64,
}

/// Node/edge view for visualization front ends
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportNode {
    pub id: String,
    #[serde(rename = "type")]
    pub concept_type: ConceptType,
    pub importance: f64,
    /// Number of documents mentioning the concept
    pub size: usize,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportEdge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    pub strength: f64,
}

/// Graph size counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub concepts: usize,
    pub relations: usize,
    pub documents: usize,
}

impl KnowledgeGraph {
    /// Documents sharing concepts with `document_id`, best first, at most
    /// [`DEFAULT_RELATED_LIMIT`]
    pub fn related_documents(&self, document_id: &str) -> Vec<RelatedDocument> {
        self.related_documents_with_limit(document_id, DEFAULT_RELATED_LIMIT)
    }

    /// Documents sharing concepts with `document_id`, best first
    ///
    /// Unknown documents yield an empty list. Ties keep document-id order.
    pub fn related_documents_with_limit(
        &self,
        document_id: &str,
        limit: usize,
    ) -> Vec<RelatedDocument> {
        let Some(mine) = self.sources().concept_set(document_id) else {
            return Vec::new();
        };

        let mut related: Vec<RelatedDocument> = self
            .sources()
            .iter()
            .filter(|(other_id, _)| *other_id != document_id)
            .filter_map(|(other_id, names)| {
                let mut shared: Vec<String> = names
                    .iter()
                    .filter(|name| mine.contains(name.as_str()))
                    .cloned()
                    .collect();
                shared.sort();
                shared.dedup();

                if shared.is_empty() {
                    return None;
                }

                let score = shared
                    .iter()
                    .map(|name| {
                        self.concepts()
                            .get(name)
                            .map_or(0.0, |concept| concept.importance)
                    })
                    .sum();

                Some(RelatedDocument {
                    document_id: other_id.to_string(),
                    shared_concepts: shared,
                    score,
                })
            })
            .collect();

        related.sort_by(|a, b| b.score.total_cmp(&a.score));
        related.truncate(limit);
        related
    }

    /// Look up a concept by any surface form that resolves to it
    pub fn concept_info(&self, name: &str) -> Option<ConceptInfo> {
        let canonical = self.canonicalize(name);
        let concept = self.concepts().get(&canonical)?;

        let related = self
            .relations()
            .involving(&concept.name)
            .filter_map(|relation| {
                relation
                    .other_endpoint(&concept.name)
                    .map(|other| RelatedConcept {
                        name: other.to_string(),
                        relation_type: relation.relation_type,
                        strength: relation.strength,
                    })
            })
            .collect();

        Some(ConceptInfo {
            name: concept.name.clone(),
            concept_type: concept.concept_type,
            importance: concept.importance,
            aliases: concept.aliases.iter().cloned().collect(),
            sources: concept.sources.iter().cloned().collect(),
            parent: concept.parent.clone(),
            related,
        })
    }

    /// One node per concept and one edge per relation
    pub fn export_graph(&self) -> GraphExport {
        let nodes = self
            .concepts()
            .iter()
            .map(|concept| ExportNode {
                id: concept.name.clone(),
                concept_type: concept.concept_type,
                importance: concept.importance,
                size: concept.sources.len(),
                sources: concept.sources.iter().cloned().collect(),
            })
            .collect();

        let edges = self
            .relations()
            .iter()
            .map(|relation| ExportEdge {
                source: relation.from.clone(),
                target: relation.to.clone(),
                relation_type: relation.relation_type,
                strength: relation.strength,
            })
            .collect();

        GraphExport { nodes, edges }
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            concepts: self.concepts().len(),
            relations: self.relations().len(),
            documents: self.sources().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::extraction::{ConceptCandidate, Extraction, RelationCandidate};

    fn concept(name: &str, importance: f64) -> ConceptCandidate {
        ConceptCandidate::new(name, ConceptType::Concept).with_importance(importance)
    }

    fn graph_with(documents: &[(&str, &[(&str, f64)])]) -> KnowledgeGraph {
        let mut graph = KnowledgeGraph::default();
        for (id, concepts) in documents {
            let extraction = Extraction::new(
                concepts.iter().map(|(n, i)| concept(n, *i)).collect(),
                Vec::new(),
            );
            graph.ingest_document(id, &extraction);
        }
        graph
    }

    #[test]
    fn test_related_documents_ranking() {
        let graph = graph_with(&[
            ("doc1", &[("Rust", 0.9), ("Tokio", 0.6), ("Serde", 0.2)]),
            ("doc2", &[("Serde", 0.2)]),
            ("doc3", &[("Rust", 0.9), ("Tokio", 0.6)]),
            ("doc4", &[("Haskell", 0.8)]),
        ]);

        let related = graph.related_documents("doc1");

        assert_eq!(related.len(), 2);
        assert_eq!(related[0].document_id, "doc3");
        assert_eq!(related[0].shared_concepts, vec!["Rust", "Tokio"]);
        assert!((related[0].score - 1.5).abs() < 1e-9);
        assert_eq!(related[1].document_id, "doc2");
    }

    #[test]
    fn test_related_documents_is_symmetric() {
        let graph = graph_with(&[
            ("a", &[("Rust", 0.9), ("Git", 0.3), ("Docker", 0.4)]),
            ("b", &[("Git", 0.3), ("Rust", 0.5), ("Kubernetes", 0.7)]),
        ]);

        let ab = graph.related_documents("a");
        let ba = graph.related_documents("b");
        assert_eq!(ab[0].score, ba[0].score);
    }

    #[test]
    fn test_related_documents_duplicates_count_once() {
        let graph = graph_with(&[
            ("doc1", &[("Rust", 0.5), ("Rust", 0.5)]),
            ("doc2", &[("Rust", 0.5), ("rust", 0.5)]),
        ]);

        let related = graph.related_documents("doc1");
        assert_eq!(related[0].shared_concepts, vec!["Rust"]);
        assert_eq!(related[0].score, 0.5);
    }

    #[test]
    fn test_related_documents_limit_and_unknown() {
        let documents: Vec<(String, Vec<(&str, f64)>)> = (0..15)
            .map(|i| (format!("doc{:02}", i), vec![("Rust", 0.5)]))
            .collect();
        let mut graph = KnowledgeGraph::default();
        for (id, concepts) in &documents {
            graph.ingest_document(
                id,
                &Extraction::new(concepts.iter().map(|(n, i)| concept(n, *i)).collect(), vec![]),
            );
        }

        assert_eq!(graph.related_documents("doc00").len(), DEFAULT_RELATED_LIMIT);
        assert_eq!(graph.related_documents_with_limit("doc00", 3).len(), 3);
        // equal scores keep document-id order
        assert_eq!(graph.related_documents_with_limit("doc00", 1)[0].document_id, "doc01");
        assert!(graph.related_documents("missing").is_empty());
    }

    #[test]
    fn test_scores_read_live_importance() {
        let mut graph = graph_with(&[("doc1", &[("Rust", 0.2)]), ("doc2", &[("Rust", 0.2)])]);
        assert_eq!(graph.related_documents("doc1")[0].score, 0.2);

        graph.ingest_document("doc3", &Extraction::new(vec![concept("Rust", 0.9)], vec![]));
        assert_eq!(graph.related_documents("doc1")[0].score, 0.9);
    }

    #[test]
    fn test_concept_info_combines_directions() {
        let mut graph = KnowledgeGraph::default();
        graph.ingest_document(
            "doc1",
            &Extraction::new(
                vec![
                    ConceptCandidate::new("Flask", ConceptType::Framework)
                        .with_importance(0.7)
                        .with_parent("Python"),
                    concept("python3", 0.9),
                    concept("Jinja", 0.4),
                ],
                vec![
                    RelationCandidate::new("Flask", "Python", RelationType::Uses)
                        .with_strength(0.8),
                    RelationCandidate::new("Jinja", "Flask", RelationType::PartOf)
                        .with_strength(0.6),
                ],
            ),
        );

        let info = graph.concept_info("flask").unwrap();
        assert_eq!(info.name, "Flask");
        assert_eq!(info.concept_type, ConceptType::Framework);
        assert_eq!(info.parent.as_deref(), Some("Python"));
        assert_eq!(info.sources, vec!["doc1"]);
        assert_eq!(info.related.len(), 2);
        assert_eq!(info.related[0].name, "Python");
        assert_eq!(info.related[0].relation_type, RelationType::Uses);
        assert_eq!(info.related[1].name, "Jinja");

        let python = graph.concept_info("PY").unwrap();
        assert_eq!(python.aliases, vec!["python3"]);

        assert!(graph.concept_info("Django").is_none());
    }

    #[test]
    fn test_export_graph() {
        let mut graph = KnowledgeGraph::default();
        graph.ingest_document(
            "doc1",
            &Extraction::new(
                vec![concept("Rust", 0.9), concept("Cargo", 0.5)],
                vec![RelationCandidate::new("Cargo", "Rust", RelationType::PartOf)],
            ),
        );
        graph.ingest_document("doc2", &Extraction::new(vec![concept("Rust", 0.4)], vec![]));

        let export = graph.export_graph();
        assert_eq!(export.nodes.len(), 2);
        assert_eq!(export.edges.len(), 1);

        let rust = export.nodes.iter().find(|n| n.id == "Rust").unwrap();
        assert_eq!(rust.size, 2);
        assert_eq!(rust.sources, vec!["doc1", "doc2"]);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["edges"][0]["source"], "Cargo");
        assert_eq!(json["edges"][0]["target"], "Rust");
        assert_eq!(json["edges"][0]["type"], "es_parte_de");
    }

    #[test]
    fn test_stats() {
        let graph = graph_with(&[("doc1", &[("Rust", 0.5)]), ("doc2", &[])]);
        assert_eq!(
            graph.stats(),
            GraphStats {
                concepts: 1,
                relations: 0,
                documents: 2,
            }
        );
    }
}
