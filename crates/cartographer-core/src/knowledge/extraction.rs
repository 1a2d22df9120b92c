//! Extraction input contract
//!
//! Concept and relation candidates arrive from an external extractor (an
//! LLM prompt in practice) and are not trusted. This module is the
//! ingestion boundary: category strings are coerced into the closed enums,
//! scores are clamped into [0, 1], and malformed items are skipped one by
//! one so a single bad entry never costs the rest of the document.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::error::{Error, Result};

use super::concept::ConceptType;
use super::relation::RelationType;

/// Score assumed when an extractor omits importance or strength
pub const DEFAULT_SCORE: f64 = 0.5;

/// Clamp a score into [0, 1]; NaN becomes 0
pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// A validated concept mention
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptCandidate {
    /// Raw surface form, trimmed
    pub name: String,
    pub concept_type: ConceptType,
    /// Importance in [0, 1]
    pub importance: f64,
    pub parent: Option<String>,
}

impl ConceptCandidate {
    /// Create a candidate with the default importance
    pub fn new(name: impl Into<String>, concept_type: ConceptType) -> Self {
        Self {
            name: name.into().trim().to_string(),
            concept_type,
            importance: DEFAULT_SCORE,
            parent: None,
        }
    }

    /// Set importance (clamped to 0.0-1.0)
    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = clamp_score(importance);
        self
    }

    /// Set the parent concept name
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = non_empty(parent.into());
        self
    }

    fn from_raw(raw: RawConcept) -> Option<Self> {
        let name = raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;
        let concept_type = raw
            .concept_type
            .as_deref()
            .map(ConceptType::coerce)
            .unwrap_or_default();

        let mut candidate = Self::new(name, concept_type)
            .with_importance(raw.importance.unwrap_or(DEFAULT_SCORE));
        candidate.parent = raw.parent.and_then(non_empty);
        Some(candidate)
    }
}

/// A validated relation assertion
#[derive(Debug, Clone, PartialEq)]
pub struct RelationCandidate {
    /// Raw surface form of the source concept
    pub from: String,
    /// Raw surface form of the target concept
    pub to: String,
    pub relation_type: RelationType,
    /// Strength in [0, 1]
    pub strength: f64,
}

impl RelationCandidate {
    /// Create a candidate with the default strength
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        relation_type: RelationType,
    ) -> Self {
        Self {
            from: from.into().trim().to_string(),
            to: to.into().trim().to_string(),
            relation_type,
            strength: DEFAULT_SCORE,
        }
    }

    /// Set strength (clamped to 0.0-1.0)
    pub fn with_strength(mut self, strength: f64) -> Self {
        self.strength = clamp_score(strength);
        self
    }

    fn from_raw(raw: RawRelation) -> Option<Self> {
        let from = raw.from.and_then(non_empty)?;
        let to = raw.to.and_then(non_empty)?;
        let relation_type = raw
            .relation_type
            .as_deref()
            .map(RelationType::coerce)
            .unwrap_or_default();

        Some(
            Self::new(from, to, relation_type)
                .with_strength(raw.strength.unwrap_or(DEFAULT_SCORE)),
        )
    }
}

/// One document's validated extraction
///
/// Deserializing goes through the lenient raw form, so any JSON object with
/// `concepts`/`relations` arrays yields an `Extraction`, minus the items
/// that could not be validated.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "RawExtraction")]
pub struct Extraction {
    pub concepts: Vec<ConceptCandidate>,
    pub relations: Vec<RelationCandidate>,
}

impl Extraction {
    /// An extraction with no candidates
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from already validated candidates
    pub fn new(concepts: Vec<ConceptCandidate>, relations: Vec<RelationCandidate>) -> Self {
        Self {
            concepts,
            relations,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.relations.is_empty()
    }

    /// Parse raw extractor output
    ///
    /// Accepts a bare JSON object, a fenced code block, or the outermost
    /// `{...}` embedded in prose. The object must carry a `concepts` key.
    pub fn parse_response(response: &str) -> Result<Self> {
        if let Some(extraction) = Self::parse_object(response.trim()) {
            return Ok(extraction);
        }

        let json_str = extract_json_from_response(response);
        Self::parse_object(&json_str).ok_or_else(|| {
            Error::ExtractionParse(format!(
                "no JSON object with a 'concepts' key in response ({} bytes)",
                response.len()
            ))
        })
    }

    fn parse_object(text: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(text).ok()?;
        if !value.as_object()?.contains_key("concepts") {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Result of running the extractor over one document
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionOutcome {
    Extracted(Extraction),
    /// The extractor output was unusable; carries the reason
    Failed(String),
}

/// One document's input to a rebuild
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentExtraction {
    pub document_id: String,
    pub outcome: ExtractionOutcome,
}

impl DocumentExtraction {
    pub fn extracted(document_id: impl Into<String>, extraction: Extraction) -> Self {
        Self {
            document_id: document_id.into(),
            outcome: ExtractionOutcome::Extracted(extraction),
        }
    }

    pub fn failed(document_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            outcome: ExtractionOutcome::Failed(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::Failed(_))
    }
}

/// Wire shape of an extraction before validation
#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default, deserialize_with = "lenient_items")]
    concepts: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_items")]
    relations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawConcept {
    name: Option<String>,
    #[serde(rename = "type")]
    concept_type: Option<String>,
    importance: Option<f64>,
    parent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    from: Option<String>,
    to: Option<String>,
    #[serde(rename = "type")]
    relation_type: Option<String>,
    strength: Option<f64>,
}

impl From<RawExtraction> for Extraction {
    fn from(raw: RawExtraction) -> Self {
        let concepts = raw
            .concepts
            .into_iter()
            .enumerate()
            .filter_map(|(position, item)| {
                let candidate = serde_json::from_value::<RawConcept>(item)
                    .ok()
                    .and_then(ConceptCandidate::from_raw);
                if candidate.is_none() {
                    warn!(position, "Skipping malformed concept candidate");
                }
                candidate
            })
            .collect();

        let relations = raw
            .relations
            .into_iter()
            .enumerate()
            .filter_map(|(position, item)| {
                let candidate = serde_json::from_value::<RawRelation>(item)
                    .ok()
                    .and_then(RelationCandidate::from_raw);
                if candidate.is_none() {
                    warn!(position, "Skipping malformed relation candidate");
                }
                candidate
            })
            .collect();

        Self {
            concepts,
            relations,
        }
    }
}

/// Accept `null` or a non-array where a list is expected, as an empty list
fn lenient_items<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => Vec::new(),
    })
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Extract JSON from a response that might contain markdown or other text
fn extract_json_from_response(response: &str) -> String {
    // Try to find JSON in code blocks first
    if let Some(start) = response.find("```json") {
        let json_start = start + 7;
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim().to_string();
        }
    }

    if let Some(start) = response.find("```") {
        let potential_start = start + 3;
        if let Some(newline) = response[potential_start..].find('\n') {
            let json_start = potential_start + newline + 1;
            if let Some(end) = response[json_start..].find("```") {
                return response[json_start..json_start + end].trim().to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (response.find('{'), response.rfind('}')) {
        if start < end {
            return response[start..=end].to_string();
        }
    }

    response.to_string()
}
