//! Document id -> canonical concept names mentioned by that document

use std::collections::{BTreeMap, BTreeSet};

/// Per-document concept lists
///
/// Lists keep extraction order and duplicates. Writing an entry replaces
/// the previous one, which makes re-ingesting a document idempotent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceIndex {
    documents: BTreeMap<String, Vec<String>>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the concept list for `document_id`, returning the old one
    pub fn set(
        &mut self,
        document_id: impl Into<String>,
        concepts: Vec<String>,
    ) -> Option<Vec<String>> {
        self.documents.insert(document_id.into(), concepts)
    }

    pub fn get(&self, document_id: &str) -> Option<&[String]> {
        self.documents.get(document_id).map(Vec::as_slice)
    }

    /// Distinct concepts of a document
    pub fn concept_set(&self, document_id: &str) -> Option<BTreeSet<&str>> {
        self.documents
            .get(document_id)
            .map(|names| names.iter().map(String::as_str).collect())
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.documents.contains_key(document_id)
    }

    /// Iterate `(document_id, concepts)` in document-id order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.documents
            .iter()
            .map(|(id, names)| (id.as_str(), names.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn clear(&mut self) {
        self.documents.clear();
    }
}
