//! Document and chunk domain models.
//!
//! A document mirrors one external item (page, file, issue). Chunks are the
//! indexable segments the pipeline cuts it into; their ids are deterministic
//! so re-ingestion overwrites rather than duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::ids;

/// One external item mirrored into the corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub source_id: String,
    /// Provider-side identifier, the natural key within a source.
    pub external_id: String,
    pub title: String,
    pub mime_type: String,
    /// Raw text content as fetched (post-normalisation when a normaliser
    /// matched the MIME type).
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the document was last pushed through the indexing pipeline.
    pub indexed_at: Option<DateTime<Utc>>,
}

impl Document {
    pub fn new(external_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ids::short_id(),
            source_id: String::new(),
            external_id: external_id.into(),
            title: title.into(),
            mime_type: "text/plain".to_string(),
            content: String::new(),
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            indexed_at: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// An indexable segment of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Deterministic id: `<document_id>-chunk-<position>`.
    pub id: String,
    pub document_id: String,
    pub source_id: String,
    pub content: String,
    /// 0-based position within the producing batch.
    pub position: usize,
    /// Character offset of the chunk start in the source text.
    pub start_char: usize,
    /// Character offset one past the chunk end.
    pub end_char: usize,
    /// Dense vector, present when an embedding service was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// The deterministic chunk id for a document position.
    pub fn id_for(document_id: &str, position: usize) -> String {
        format!("{document_id}-chunk-{position}")
    }

    pub fn new(
        document_id: impl Into<String>,
        source_id: impl Into<String>,
        content: impl Into<String>,
        position: usize,
    ) -> Self {
        let document_id = document_id.into();
        Self {
            id: Self::id_for(&document_id, position),
            document_id,
            source_id: source_id.into(),
            content: content.into(),
            position,
            start_char: 0,
            end_char: 0,
            embedding: None,
        }
    }

    pub fn with_offsets(mut self, start_char: usize, end_char: usize) -> Self {
        self.start_char = start_char;
        self.end_char = end_char;
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_is_deterministic() {
        assert_eq!(Chunk::id_for("doc-1", 0), "doc-1-chunk-0");
        assert_eq!(Chunk::id_for("doc-1", 7), "doc-1-chunk-7");

        let chunk = Chunk::new("doc-1", "src-1", "text", 3);
        assert_eq!(chunk.id, "doc-1-chunk-3");
    }

    #[test]
    fn test_document_builder() {
        let doc = Document::new("ext-1", "Title")
            .with_mime_type("text/markdown")
            .with_content("# hello")
            .with_metadata("url", serde_json::json!("https://example.com"));
        assert_eq!(doc.mime_type, "text/markdown");
        assert_eq!(doc.content, "# hello");
        assert!(doc.indexed_at.is_none());
    }
}
