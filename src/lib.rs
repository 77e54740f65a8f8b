//! # Textbook Companion
//!
//! Selection-aware context extraction and backend clients for an
//! interactive textbook.
//!
//! A reader selects text on a chapter page; the companion works out where
//! that text sits (section heading, nearby prose, chapter, source id),
//! composes it into a prompt prefix, and sends it with the reader's
//! question to a retrieval-augmented-generation backend. A chat widget
//! talks to a separate question-answering endpoint.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌────────────┐
//! │ Selection │──▶│  Extract  │──▶│ Compose  │──▶│ RAG client │
//! │ observer  │   │ (layout)  │   │          │   │  /rag/...  │
//! └───────────┘   └───────────┘   └──────────┘   └────────────┘
//!
//! ┌─────────────┐        ┌──────────────┐
//! │ Chat widget │───────▶│ chat endpoint│
//! └─────────────┘        └──────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and wire records |
//! | [`selection`] | Selection observer |
//! | [`layout`] | Element geometry and anchor resolution |
//! | [`extract`] | Context extraction around a selection |
//! | [`compose`] | Prompt-prefix composition |
//! | [`rag`] | RAG backend client |
//! | [`chapter`] | Chapter fetch and rendering |
//! | [`chat`] | Chat widget state machine |
//! | [`auth`] | Auth library configuration |
//! | [`logging`] | Tracing subscriber setup |

pub mod auth;
pub mod chapter;
pub mod chat;
pub mod compose;
pub mod config;
pub mod extract;
pub mod layout;
pub mod logging;
pub mod models;
pub mod rag;
pub mod selection;
