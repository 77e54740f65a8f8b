//! Chapter page: fetch and render.
//!
//! Chapters are fetched read-only from `GET {api.base_url}/chapters/{id}`.
//! The `content` field is HTML from a trusted producer and is rendered as
//! is; sanitizing it is the producer's job.

use anyhow::Result;
use scraper::Html;

use crate::config::ApiConfig;
use crate::layout::collapse_whitespace;
use crate::models::Chapter;
use crate::rag::{http_client, send_json};

#[derive(Debug, Clone)]
pub struct ChapterClient {
    http: reqwest::Client,
    base_url: String,
}

impl ChapterClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_chapter(&self, id: &str) -> Result<Chapter> {
        tracing::debug!(id, "fetching chapter");
        let url = format!("{}/chapters/{}", self.base_url, id);
        send_json("get chapter", self.http.get(url)).await
    }
}

/// What the chapter page shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ChapterView {
    Loading,
    Loaded(Chapter),
    /// Raw error text, shown inline.
    Failed(String),
}

impl ChapterView {
    pub async fn load(client: &ChapterClient, id: &str) -> Self {
        match client.get_chapter(id).await {
            Ok(chapter) => ChapterView::Loaded(chapter),
            Err(e) => ChapterView::Failed(format!("{:#}", e)),
        }
    }
}

/// Plain-text rendering of a chapter for terminals.
pub fn render_text(chapter: &Chapter) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", chapter.title));
    out.push_str(&format!(
        "Module: {}   Week: {}   Duration: {} hours   Difficulty: {}\n",
        chapter.module_id, chapter.week_number, chapter.estimated_duration, chapter.difficulty
    ));

    if !chapter.learning_objectives.is_empty() {
        out.push_str("\nLearning objectives:\n");
        for objective in &chapter.learning_objectives {
            out.push_str(&format!("  - {}\n", objective));
        }
    }
    if !chapter.prerequisites.is_empty() {
        out.push_str("\nPrerequisites:\n");
        for prereq in &chapter.prerequisites {
            out.push_str(&format!("  - {}\n", prereq));
        }
    }

    let body = html_to_text(&chapter.content);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
        out.push('\n');
    }
    out
}

/// Flatten HTML to text, one line per text node.
fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .text()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
