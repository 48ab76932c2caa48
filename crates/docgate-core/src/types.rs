//! Core data types for Docgate.
//!
//! This module defines the documents stored in an index and the shapes in
//! which search hits come back. These types are designed to be:
//!
//! - **Serializable**: For persistence to disk
//! - **Engine-agnostic**: Nothing here depends on how a query is evaluated

use crate::error::{DocgateError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field holding the (internal) document URL
pub const FIELD_URL: &str = "url";
/// Field holding the document title
pub const FIELD_TITLE: &str = "title";
/// Field holding a title with highlighted query terms
pub const FIELD_HIGHLIGHTED_TITLE: &str = "highlightedTitle";
/// Field holding the document text
pub const FIELD_CONTENT: &str = "content";
/// Field holding the access-control groups a document is visible to
pub const FIELD_ACCESS_CONTROL_GROUPS: &str = "groups";

/// A stored field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Searchable text, tokenized on whitespace
    Text(String),

    /// Stored-only binary value (not searchable)
    Binary(Vec<u8>),
}

/// A document in an index: a set of named fields.
///
/// Text fields are tokenized on whitespace when searched; tokens compare
/// case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    fields: BTreeMap<String, FieldValue>,
}

impl Document {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text field
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), FieldValue::Text(value.into()));
        self
    }

    /// Set a binary field
    pub fn with_binary(mut self, name: impl Into<String>, value: Vec<u8>) -> Self {
        self.fields.insert(name.into(), FieldValue::Binary(value));
        self
    }

    /// Store `value` lz4-compressed in a binary field
    pub fn with_compressed(self, name: impl Into<String>, value: &str) -> Self {
        let compressed = lz4_flex::compress_prepend_size(value.as_bytes());
        self.with_binary(name, compressed)
    }

    /// The value of a text field
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// The value of a binary field
    pub fn binary_value(&self, name: &str) -> Option<&[u8]> {
        match self.fields.get(name) {
            Some(FieldValue::Binary(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// The whitespace tokens of a text field
    pub fn tokens<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.get(name).unwrap_or("").split_whitespace()
    }

    /// The document URL
    pub fn url(&self) -> Option<&str> {
        self.get(FIELD_URL)
    }

    /// All fields by name
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// The content of a compressed stored field.
    ///
    /// A missing field yields an empty string.
    pub fn compressed_field_value(&self, name: &str) -> Result<String> {
        let compressed = match self.binary_value(name) {
            Some(bytes) => bytes,
            None => return Ok(String::new()),
        };

        let bytes = lz4_flex::decompress_size_prepended(compressed).map_err(|e| {
            DocgateError::Decompression {
                field: name.to_string(),
                reason: e.to_string(),
            }
        })?;

        String::from_utf8(bytes).map_err(|e| {
            DocgateError::decoding(format!("field '{}' is not valid UTF-8: {}", name, e))
        })
    }
}

/// A document matched by a search, with its relevance score.
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    /// The matching document
    pub document: Document,

    /// Relevance score (higher is more relevant)
    pub score: u32,
}

/// The outcome of searching one index.
#[derive(Debug, Clone, Default)]
pub struct TopDocs {
    /// Number of matching documents, including those beyond the limit
    pub total_hits: usize,

    /// The best matches, best first
    pub hits: Vec<ScoredDocument>,
}

/// Statistics about an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of documents
    pub document_count: u64,

    /// Format version of the stored index
    pub version: u32,

    /// When the index was last modified
    pub last_updated: Option<DateTime<Utc>>,
}

impl IndexStats {
    /// Create empty statistics
    pub fn new() -> Self {
        IndexStats {
            document_count: 0,
            version: crate::persistence::INDEX_VERSION,
            last_updated: None,
        }
    }
}

impl Default for IndexStats {
    fn default() -> Self {
        Self::new()
    }
}
