//! Prompt-prefix composition.
//!
//! Turns an [`ExtractedContext`] into the block of text sent to the backend
//! ahead of the reader's question.

use serde::Serialize;

use crate::models::{ExtractedContext, RagQueryRequest};

/// Label attached to queries whose context came from a chapter page.
pub const CHAPTER_SOURCE_TYPE: &str = "textbook_chapter";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedContext {
    pub context_text: String,
    pub source_id: Option<String>,
    pub source_type: Option<String>,
}

/// Build the context block: chapter, section, selected text and
/// surrounding text, in that order, skipping empty parts and separating
/// the rest with a blank line.
pub fn compose(ctx: &ExtractedContext) -> ComposedContext {
    let non_empty = |field: &Option<String>| field.clone().filter(|t| !t.is_empty());
    let source_id = non_empty(&ctx.source_id);

    let parts = [
        non_empty(&ctx.chapter_title).map(|t| format!("Chapter: {}", t)),
        non_empty(&ctx.section_title).map(|t| format!("Section: {}", t)),
        Some(format!("Selected text: {}", ctx.text)),
        Some(ctx.surrounding_text.as_str())
            .filter(|t| !t.is_empty())
            .map(|t| format!("Surrounding context: {}", t)),
    ];

    let context_text = parts
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n\n");

    ComposedContext {
        context_text,
        source_type: source_id.as_ref().map(|_| CHAPTER_SOURCE_TYPE.to_string()),
        source_id,
    }
}

impl ComposedContext {
    /// Attach this context to a question for `POST /rag/query`.
    pub fn into_query(
        self,
        query_text: impl Into<String>,
        user_id: Option<String>,
        session_id: Option<String>,
    ) -> RagQueryRequest {
        RagQueryRequest {
            query_text: query_text.into(),
            context_text: Some(self.context_text),
            source_id: self.source_id,
            source_type: self.source_type,
            user_id,
            session_id,
        }
    }
}
