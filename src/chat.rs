//! Chat widget.
//!
//! A two-state (closed/open) widget holding an append-only message log and
//! a draft buffer. Submitting sends the draft to an external chat endpoint
//! (not the RAG client) and appends the reply as a bot message.
//!
//! # Submission
//!
//! ```text
//! draft ──▶ begin_submit ──▶ ChatBackend::ask ──▶ finish_submit
//!            (user msg,                           (bot msg,
//!             loading = true)                      loading = false)
//! ```
//!
//! While `loading` is set further submissions are ignored. Every outcome
//! clears it: answer, failure, unrecognized reply, or cancellation.
//!
//! # Reply decoding
//!
//! The endpoint's JSON is decoded once into [`AskReply`]:
//!
//! | Payload | Decoded | Bot message |
//! |---------|---------|-------------|
//! | object with non-empty `response` | `Answer` | the response |
//! | object with non-empty `answer` | `Answer` | the answer |
//! | non-blank bare JSON string | `BareString` | the string |
//! | anything else | `Unrecognized` | fallback text |
//! | transport error, HTTP error, non-JSON body | n/a | apology text |

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;

use crate::config::ChatConfig;
use crate::models::{Message, Sender};
use crate::rag::{http_client, send_json};

// ============ Backend ============

/// The external question-answering endpoint.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send `query` and return the decoded JSON reply.
    async fn ask(&self, query: &str) -> Result<Value>;
}

#[derive(Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

/// `POST {chat.endpoint}` with `{"query": ...}`.
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpChatBackend {
    pub fn new(config: &ChatConfig, timeout_secs: Option<u64>) -> Result<Self> {
        Ok(Self {
            http: http_client(timeout_secs)?,
            endpoint: config.endpoint.clone(),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn ask(&self, query: &str) -> Result<Value> {
        send_json(
            "ask",
            self.http.post(&self.endpoint).json(&AskRequest { query }),
        )
        .await
    }
}

// ============ Reply decoding ============

#[derive(Deserialize)]
#[serde(untagged)]
enum WireReply {
    Text(String),
    Fields {
        #[serde(default)]
        response: Option<String>,
        #[serde(default)]
        answer: Option<String>,
    },
}

/// Recognized shapes of a chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskReply {
    Answer(String),
    BareString(String),
    Unrecognized,
}

impl AskReply {
    pub fn decode(value: Value) -> Self {
        let non_empty = |s: Option<String>| s.filter(|s| !s.trim().is_empty());

        match serde_json::from_value::<WireReply>(value) {
            Ok(WireReply::Fields { response, answer }) => non_empty(response)
                .or_else(|| non_empty(answer))
                .map(AskReply::Answer)
                .unwrap_or(AskReply::Unrecognized),
            Ok(WireReply::Text(s)) => non_empty(Some(s))
                .map(AskReply::BareString)
                .unwrap_or(AskReply::Unrecognized),
            Err(_) => AskReply::Unrecognized,
        }
    }

    /// Text for the bot message.
    pub fn into_text(self, fallback: &str) -> String {
        match self {
            AskReply::Answer(text) | AskReply::BareString(text) => text,
            AskReply::Unrecognized => fallback.to_string(),
        }
    }
}

// ============ Cancellation ============

/// Fires a [`Cancellation`].
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Resolves once its [`CancelHandle`] fires. Never resolves if the handle
/// is dropped without firing.
#[derive(Debug, Clone)]
pub struct Cancellation(watch::Receiver<bool>);

impl Cancellation {
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Cancellation(rx)
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    async fn cancelled(&mut self) {
        if self.0.wait_for(|fired| *fired).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub fn cancellation() -> (CancelHandle, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(tx), Cancellation(rx))
}

// ============ Message log ============

/// Ordered chat history. Entries can only be appended.
#[derive(Debug, Clone, Default)]
pub struct MessageLog(Vec<Message>);

impl MessageLog {
    fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }
}

// ============ Widget ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    ShiftEnter,
    Backspace,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The draft should be submitted.
    Submit,
    Edited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Closed, busy, or empty draft.
    Ignored,
    Answered,
    /// The backend call failed; the apology was appended.
    Failed,
    /// Cancelled before the reply arrived; nothing was appended.
    Cancelled,
}

#[derive(Debug)]
pub struct ChatWidget {
    state: WidgetState,
    draft: String,
    log: MessageLog,
    loading: bool,
    fallback_message: String,
    apology_message: String,
}

impl ChatWidget {
    /// A closed widget whose log holds the greeting.
    pub fn new(config: &ChatConfig) -> Self {
        let mut log = MessageLog::default();
        log.push(Message::new(config.greeting_message.clone(), Sender::Bot));
        Self {
            state: WidgetState::Closed,
            draft: String::new(),
            log,
            loading: false,
            fallback_message: config.fallback_message.clone(),
            apology_message: config.apology_message.clone(),
        }
    }

    pub fn toggle(&mut self) -> WidgetState {
        self.state = match self.state {
            WidgetState::Closed => WidgetState::Open,
            WidgetState::Open => WidgetState::Closed,
        };
        tracing::info!(state = ?self.state, "chat widget toggled");
        self.state
    }

    pub fn state(&self) -> WidgetState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == WidgetState::Open
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn messages(&self) -> &MessageLog {
        &self.log
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Enter submits; Shift+Enter inserts a newline.
    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        match key {
            Key::Enter => return KeyOutcome::Submit,
            Key::ShiftEnter => self.draft.push('\n'),
            Key::Backspace => {
                self.draft.pop();
            }
            Key::Char(c) => self.draft.push(c),
        }
        KeyOutcome::Edited
    }

    /// Start a submission: append the user message, clear the draft and
    /// set `loading`. Returns the query to send, or `None` if the widget is
    /// closed, busy, or the draft is blank. The draft is sent as typed.
    pub fn begin_submit(&mut self) -> Option<String> {
        if !self.is_open() || self.loading || self.draft.trim().is_empty() {
            return None;
        }

        let query = std::mem::take(&mut self.draft);
        self.log.push(Message::new(query.clone(), Sender::User));
        self.loading = true;
        Some(query)
    }

    /// Complete a submission with the backend's result.
    pub fn finish_submit(&mut self, reply: Result<Value>) -> SubmitOutcome {
        let (text, outcome) = match reply {
            Ok(value) => (
                AskReply::decode(value).into_text(&self.fallback_message),
                SubmitOutcome::Answered,
            ),
            Err(e) => {
                tracing::warn!(error = %format!("{:#}", e), "chat request failed");
                (self.apology_message.clone(), SubmitOutcome::Failed)
            }
        };
        self.log.push(Message::new(text, Sender::Bot));
        self.loading = false;
        outcome
    }

    /// Abandon an in-flight submission without a bot message.
    pub fn cancel_submit(&mut self) -> SubmitOutcome {
        self.loading = false;
        SubmitOutcome::Cancelled
    }

    /// Send the draft to `backend` and append the reply.
    pub async fn submit(
        &mut self,
        backend: &dyn ChatBackend,
        cancel: &mut Cancellation,
    ) -> SubmitOutcome {
        let Some(query) = self.begin_submit() else {
            return SubmitOutcome::Ignored;
        };
        tracing::info!(chars = query.chars().count(), "chat message submitted");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => self.cancel_submit(),
            reply = backend.ask(&query) => self.finish_submit(reply),
        }
    }
}
