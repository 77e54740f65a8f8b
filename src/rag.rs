//! REST client for the RAG backend.
//!
//! Each operation is a single request/response exchange against
//! `{api.base_url}/rag/...`:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | `POST` | `/rag/query` | [`RagClient::submit_query`] |
//! | `GET`  | `/rag/query/{id}` | [`RagClient::get_query`] |
//! | `POST` | `/rag/process-text` | [`RagClient::process_text`] |
//! | `POST` | `/rag/feedback/{id}` | [`RagClient::submit_feedback`] |
//!
//! # Error Policy
//!
//! No retry and no backoff. Transport failures, non-success statuses and
//! undecodable bodies are all logged and returned as one error naming the
//! operation; status codes are not interpreted individually. Repeated
//! calls create repeated backend records.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::config::ApiConfig;
use crate::models::{
    FeedbackAck, FeedbackRequest, ProcessTextRequest, ProcessTextResponse, RagQueryRequest,
    RagQueryResponse,
};

/// Build the shared HTTP client. A timeout is set only when configured.
pub(crate) fn http_client(timeout_secs: Option<u64>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    builder.build().context("Failed to build HTTP client")
}

/// Send a prepared request and decode a JSON body, collapsing every
/// failure into one error.
pub(crate) async fn send_json<T: DeserializeOwned>(
    operation: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let result = exchange(operation, request).await;
    if let Err(e) = &result {
        tracing::error!(operation, error = %format!("{:#}", e), "backend call failed");
    }
    result
}

async fn exchange<T: DeserializeOwned>(
    operation: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request
        .header("Content-Type", "application/json")
        .send()
        .await
        .with_context(|| format!("{} request failed", operation))?;

    let status = response.status();
    if !status.is_success() {
        let body_text = response.text().await.unwrap_or_default();
        anyhow::bail!("{} failed with HTTP {}: {}", operation, status, body_text);
    }

    response
        .json::<T>()
        .await
        .with_context(|| format!("{} returned an unexpected response body", operation))
}

#[derive(Debug, Clone)]
pub struct RagClient {
    http: reqwest::Client,
    base_url: String,
}

impl RagClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Submit a question, optionally with composed context.
    pub async fn submit_query(&self, request: &RagQueryRequest) -> Result<RagQueryResponse> {
        tracing::debug!(query = %request.query_text, has_context = request.context_text.is_some(), "submitting RAG query");
        send_json(
            "submit query",
            self.http.post(self.url("/rag/query")).json(request),
        )
        .await
    }

    /// Fetch a previously submitted query by id.
    pub async fn get_query(&self, id: &str) -> Result<RagQueryResponse> {
        tracing::debug!(id, "fetching RAG query");
        send_json(
            "get query",
            self.http.get(self.url(&format!("/rag/query/{}", id))),
        )
        .await
    }

    /// Submit raw text for chunking and indexing by the backend.
    pub async fn process_text(
        &self,
        content: &str,
        source_id: &str,
        source_type: &str,
    ) -> Result<ProcessTextResponse> {
        let body = ProcessTextRequest {
            content: content.to_string(),
            source_id: source_id.to_string(),
            source_type: source_type.to_string(),
        };
        tracing::debug!(source_id, source_type, bytes = content.len(), "submitting text");
        send_json(
            "process text",
            self.http.post(self.url("/rag/process-text")).json(&body),
        )
        .await
    }

    /// Rate the answer to a query.
    pub async fn submit_feedback(&self, query_id: &str, score: i32) -> Result<FeedbackAck> {
        tracing::debug!(query_id, score, "submitting feedback");
        send_json(
            "submit feedback",
            self.http
                .post(self.url(&format!("/rag/feedback/{}", query_id)))
                .json(&FeedbackRequest {
                    feedback_score: score,
                }),
        )
        .await
    }
}
