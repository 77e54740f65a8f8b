use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

/// Backend REST API (RAG + chapters).
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// No timeout unless set.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

/// External chat backend used by the chat widget.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_endpoint")]
    pub endpoint: String,
    /// First bot message in a new widget's log.
    #[serde(default = "default_greeting_message")]
    pub greeting_message: String,
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,
    #[serde(default = "default_apology_message")]
    pub apology_message: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: default_chat_endpoint(),
            greeting_message: default_greeting_message(),
            fallback_message: default_fallback_message(),
            apology_message: default_apology_message(),
        }
    }
}

fn default_chat_endpoint() -> String {
    "http://localhost:8000/ask".to_string()
}
fn default_greeting_message() -> String {
    "Hello! I'm your AI assistant. How can I help you today?".to_string()
}
fn default_fallback_message() -> String {
    "I couldn't generate a response.".to_string()
}
fn default_apology_message() -> String {
    "Sorry, I encountered an error processing your request. Please try again.".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_heading_max_distance")]
    pub heading_max_distance: f64,
    #[serde(default = "default_max_ancestor_depth")]
    pub max_ancestor_depth: usize,
    #[serde(default = "default_ancestor_text_limit")]
    pub ancestor_text_limit: usize,
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    #[serde(default = "default_chapter_title_selector")]
    pub chapter_title_selector: String,
    #[serde(default = "default_source_id_attribute")]
    pub source_id_attribute: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            heading_max_distance: default_heading_max_distance(),
            max_ancestor_depth: default_max_ancestor_depth(),
            ancestor_text_limit: default_ancestor_text_limit(),
            context_window: default_context_window(),
            chapter_title_selector: default_chapter_title_selector(),
            source_id_attribute: default_source_id_attribute(),
        }
    }
}

fn default_heading_max_distance() -> f64 {
    500.0
}
fn default_max_ancestor_depth() -> usize {
    3
}
fn default_ancestor_text_limit() -> usize {
    500
}
fn default_context_window() -> usize {
    100
}
fn default_chapter_title_selector() -> String {
    "h1, .chapter-title, .docTitle, [data-chapter-title]".to_string()
}
fn default_source_id_attribute() -> String {
    "data-source-id".to_string()
}

/// Geometry used when no real layout engine is available.
#[derive(Debug, Deserialize, Clone)]
pub struct LayoutConfig {
    #[serde(default = "default_chars_per_line")]
    pub chars_per_line: usize,
    #[serde(default = "default_line_height")]
    pub line_height: f64,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: f64,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            chars_per_line: default_chars_per_line(),
            line_height: default_line_height(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

fn default_chars_per_line() -> usize {
    80
}
fn default_line_height() -> f64 {
    24.0
}
fn default_viewport_width() -> f64 {
    1280.0
}
fn default_viewport_height() -> f64 {
    800.0
}

impl Config {
    /// All-defaults config for commands that can run without a file.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;

    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if !is_http_url(&config.api.base_url) {
        anyhow::bail!(
            "api.base_url must start with http:// or https:// (got '{}')",
            config.api.base_url
        );
    }
    if !is_http_url(&config.chat.endpoint) {
        anyhow::bail!(
            "chat.endpoint must start with http:// or https:// (got '{}')",
            config.chat.endpoint
        );
    }

    // Validate extraction
    let ex = &config.extraction;
    if !(ex.heading_max_distance >= 0.0) {
        anyhow::bail!("extraction.heading_max_distance must be >= 0");
    }
    if ex.max_ancestor_depth == 0 {
        anyhow::bail!("extraction.max_ancestor_depth must be >= 1");
    }
    if ex.ancestor_text_limit == 0 {
        anyhow::bail!("extraction.ancestor_text_limit must be > 0");
    }
    if scraper::Selector::parse(&ex.chapter_title_selector).is_err() {
        anyhow::bail!(
            "extraction.chapter_title_selector is not a valid CSS selector: '{}'",
            ex.chapter_title_selector
        );
    }

    // Validate layout
    if config.layout.chars_per_line == 0 {
        anyhow::bail!("layout.chars_per_line must be > 0");
    }
    if !(config.layout.line_height > 0.0) {
        anyhow::bail!("layout.line_height must be > 0");
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
