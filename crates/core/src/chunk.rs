//! Retrieved regulation chunks.

use serde::{Deserialize, Serialize};

/// How a chunk's content entered the corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContentType {
    #[default]
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "image-ocr")]
    ImageOcr,
}

/// One retrieval hit from the vector index, normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Source document identifier (typically the PDF filename).
    pub document: String,

    /// Page number within the document.
    pub page: u32,

    /// Paragraph index within the page, when the index tracked it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph: Option<u32>,

    /// Section title/heading, when the index tracked it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The chunk text.
    pub content: String,

    #[serde(default)]
    pub content_type: ContentType,

    /// Relevance score in [0, 1].
    pub score: f32,

    /// Set when the model later marks this chunk as the one it used.
    #[serde(default)]
    pub selected: bool,
}

impl RetrievedChunk {
    /// A one-line source marker for prompts and logs,
    /// e.g. `regs_2024.pdf p.5 §Extensions`.
    pub fn source_marker(&self) -> String {
        match &self.title {
            Some(title) => format!("{} p.{} §{}", self.document, self.page, title),
            None => format!("{} p.{}", self.document, self.page),
        }
    }
}
