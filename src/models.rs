//! Core data models used throughout the companion.
//!
//! These types represent the selections, extracted contexts, chat messages,
//! and backend wire records that flow through the selection → context →
//! query pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in layout units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the bottom and right edges are exclusive.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }
}

/// Opaque handle to a range owned by the selection source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeHandle(pub u64);

/// A selection snapshot captured at event time.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub text: String,
    pub range: Option<RangeHandle>,
    pub rect: Option<Rect>,
}

impl Selection {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            range: None,
            rect: None,
        }
    }
}

/// Structure recovered around a selection.
///
/// `text` is always the selection exactly as passed to the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContext {
    pub text: String,
    pub surrounding_text: String,
    pub section_title: Option<String>,
    pub chapter_title: Option<String>,
    pub source_id: Option<String>,
}

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

/// A single chat turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, sender: Sender) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            sender,
            timestamp: Utc::now(),
        }
    }
}

/// Body of `POST /rag/query`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RagQueryRequest {
    pub query_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl RagQueryRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            ..Default::default()
        }
    }
}

/// A query record as stored by the RAG backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagQueryResponse {
    pub id: String,
    pub query_text: String,
    pub response_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_chunks: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    pub created_at: String,
}

/// Body of `POST /rag/process-text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTextRequest {
    pub content: String,
    pub source_id: String,
    pub source_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessTextResponse {
    pub message: String,
    pub chunk_count: u64,
}

/// Body of `POST /rag/feedback/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub feedback_score: i32,
}

/// Acknowledgement for a feedback submission. Fields beyond `message`
/// are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackAck {
    #[serde(default)]
    pub message: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A chapter page record from `GET /chapters/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: String,
    pub title: String,
    /// Raw HTML from a trusted producer.
    pub content: String,
    pub module_id: String,
    pub week_number: u32,
    #[serde(default)]
    pub learning_objectives: Vec<String>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Hours.
    pub estimated_duration: f64,
    pub difficulty: String,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let r = Rect::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(r.top(), 20.0);
        assert_eq!(r.left(), 10.0);
        assert_eq!(r.right(), 110.0);
        assert_eq!(r.bottom(), 70.0);
        assert!(r.contains(10.0, 20.0));
        assert!(!r.contains(110.0, 20.0));
        assert!(!r.contains(50.0, 70.0));
    }

    #[test]
    fn test_query_request_omits_absent_fields() {
        let req = RagQueryRequest::new("What is ROS2?");
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "query_text": "What is ROS2?" }));
    }

    #[test]
    fn test_extracted_context_is_camel_case() {
        let ctx = ExtractedContext {
            text: "a".into(),
            surrounding_text: "b a c".into(),
            section_title: None,
            chapter_title: Some("Ch".into()),
            source_id: None,
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert_eq!(json["surroundingText"], "b a c");
        assert_eq!(json["chapterTitle"], "Ch");
        assert!(json["sectionTitle"].is_null());
    }

    #[test]
    fn test_sender_wire_names() {
        let msg = Message::new("hi", Sender::Bot);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["sender"], "bot");
        assert!(uuid::Uuid::parse_str(&msg.id).is_ok());
    }

    #[test]
    fn test_feedback_ack_keeps_extra_fields() {
        let ack: FeedbackAck =
            serde_json::from_str(r#"{"message":"ok","query_id":"q1"}"#).unwrap();
        assert_eq!(ack.message, "ok");
        assert_eq!(ack.extra["query_id"], "q1");

        let bare: FeedbackAck = serde_json::from_str("{}").unwrap();
        assert_eq!(bare.message, "");
    }
}
