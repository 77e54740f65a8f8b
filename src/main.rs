//! # Textbook Companion CLI (`tbc`)
//!
//! Drives the selection → context → query pipeline from a terminal, against
//! a saved chapter page and a running backend.
//!
//! ## Usage
//!
//! ```bash
//! tbc --config ./config/tbc.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tbc context` | Extract and compose context for a selection (offline) |
//! | `tbc ask` | Extract context and submit a RAG query |
//! | `tbc query <id>` | Fetch a stored query |
//! | `tbc ingest <file>` | Submit text for ingestion |
//! | `tbc feedback <id> <score>` | Rate a query's answer |
//! | `tbc chapter <id>` | Fetch and render a chapter |
//! | `tbc chat` | Interactive chat widget |
//! | `tbc auth` | Print the auth library configuration |
//!
//! ## Examples
//!
//! ```bash
//! # What would be sent for this selection?
//! tbc context --page chapter-4.html --select "torque control"
//!
//! # Ask about it
//! tbc ask --page chapter-4.html --select "torque control" --question "Why does this matter?"
//!
//! # Chat; end a line with \ to continue on the next one
//! tbc chat
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use scraper::Html;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};

use textbook_companion::auth::AuthConfig;
use textbook_companion::chapter::{render_text, ChapterClient, ChapterView};
use textbook_companion::chat::{cancellation, ChatWidget, HttpChatBackend, Key, KeyOutcome};
use textbook_companion::compose::{compose, CHAPTER_SOURCE_TYPE};
use textbook_companion::config::{self, Config};
use textbook_companion::extract::ContextExtractor;
use textbook_companion::layout::{
    AnchorResolver, Chain, ContainingText, FlowLayout, SelectorAnchor, ViewportCenter,
};
use textbook_companion::logging;
use textbook_companion::models::{ExtractedContext, Sender};
use textbook_companion::rag::RagClient;
use textbook_companion::selection::{SelectionEvent, SelectionObserver, StaticSelection};

/// Textbook Companion CLI: selection-aware questions against the
/// textbook's RAG backend.
#[derive(Parser)]
#[command(name = "tbc", version, about = "Textbook Companion: selection-aware RAG client")]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// `context` and `auth` fall back to built-in defaults when the file
    /// does not exist.
    #[arg(long, global = true, default_value = "./config/tbc.toml")]
    config: PathBuf,

    /// Debug-level logging on stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where a selection comes from.
#[derive(clap::Args)]
struct SelectionArgs {
    /// Saved chapter page (HTML).
    #[arg(long)]
    page: PathBuf,

    /// The selected text.
    #[arg(long)]
    select: String,

    /// CSS selector for the element containing the selection. When absent
    /// or unmatched, the element is found by text, then by viewport center.
    #[arg(long)]
    anchor: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract and compose context for a selection without contacting the backend.
    Context {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Extract context for a selection and submit a RAG query.
    Ask {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Question to ask. Defaults to the selected text.
        #[arg(long)]
        question: Option<String>,

        #[arg(long)]
        user_id: Option<String>,

        #[arg(long)]
        session_id: Option<String>,
    },

    /// Fetch a previously submitted query by id.
    Query { id: String },

    /// Submit a text file to the backend for chunking and indexing.
    Ingest {
        file: PathBuf,

        #[arg(long)]
        source_id: String,

        #[arg(long, default_value = CHAPTER_SOURCE_TYPE)]
        source_type: String,
    },

    /// Rate the answer to a query.
    Feedback {
        id: String,
        #[arg(allow_negative_numbers = true)]
        score: i32,
    },

    /// Fetch and render a chapter.
    Chapter { id: String },

    /// Interactive chat widget.
    ///
    /// Enter sends; a line ending in `\` continues on the next line.
    /// `/quit` exits.
    Chat,

    /// Print the auth library configuration (password redacted).
    Auth,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Context { selection } => {
            let cfg = config_or_minimal(&cli.config)?;
            let ctx = extract_selection(&cfg, &selection)?;
            println!("{}", serde_json::to_string_pretty(&ctx)?);
            println!("---");
            println!("{}", compose(&ctx).context_text);
        }
        Commands::Auth => {
            let auth = AuthConfig::from_env()?;
            println!("{}", serde_json::to_string_pretty(&auth.redacted())?);
        }
        Commands::Ask {
            selection,
            question,
            user_id,
            session_id,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let ctx = extract_selection(&cfg, &selection)?;
            let query_text = question.unwrap_or_else(|| ctx.text.clone());
            let request = compose(&ctx).into_query(query_text, user_id, session_id);

            let client = RagClient::new(&cfg.api)?;
            let response = client.submit_query(&request).await?;
            println!("{}", response.response_text);
            println!();
            println!("query id: {}", response.id);
            if let Some(score) = response.confidence_score {
                println!("confidence: {:.2}", score);
            }
            if let Some(chunks) = &response.retrieved_chunks {
                println!("retrieved chunks: {}", chunks.len());
            }
        }
        Commands::Query { id } => {
            let cfg = config::load_config(&cli.config)?;
            let response = RagClient::new(&cfg.api)?.get_query(&id).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Ingest {
            file,
            source_id,
            source_type,
        } => {
            let cfg = config::load_config(&cli.config)?;
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let response = RagClient::new(&cfg.api)?
                .process_text(&content, &source_id, &source_type)
                .await?;
            println!("{}", response.message);
            println!("chunks: {}", response.chunk_count);
        }
        Commands::Feedback { id, score } => {
            let cfg = config::load_config(&cli.config)?;
            let ack = RagClient::new(&cfg.api)?.submit_feedback(&id, score).await?;
            println!("{}", ack.message);
        }
        Commands::Chapter { id } => {
            let cfg = config::load_config(&cli.config)?;
            let client = ChapterClient::new(&cfg.api)?;
            match ChapterView::load(&client, &id).await {
                ChapterView::Loaded(chapter) => print!("{}", render_text(&chapter)),
                ChapterView::Failed(message) => bail!("Error loading chapter: {}", message),
                ChapterView::Loading => bail!("chapter {} is still loading", id),
            }
        }
        Commands::Chat => {
            let cfg = config::load_config(&cli.config)?;
            run_chat(&cfg).await?;
        }
    }

    Ok(())
}

/// Load the config file if it exists, otherwise use defaults.
fn config_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

/// Run a command-line selection through the observer and extractor.
fn extract_selection(cfg: &Config, args: &SelectionArgs) -> Result<ExtractedContext> {
    let html = std::fs::read_to_string(&args.page)
        .with_context(|| format!("Failed to read page: {}", args.page.display()))?;
    let page = Html::parse_document(&html);

    let source = StaticSelection::text(args.select.as_str());
    let mut observer = SelectionObserver::new();
    observer.on_event(SelectionEvent::PointerUp, &source);
    if !observer.is_visible() {
        bail!("--select must contain non-whitespace text");
    }
    let selected = observer.selected_text();

    let anchor = args.anchor.as_ref().and_then(|css| {
        let found = SelectorAnchor(css.clone()).resolve(&page, selected);
        if found.is_none() {
            tracing::warn!(selector = %css, "anchor selector matched nothing; falling back");
        }
        found
    });

    let layout = FlowLayout::from_config(&cfg.layout);
    let fallback = Chain::new()
        .then(ContainingText)
        .then(ViewportCenter::new(layout.clone(), &cfg.layout));
    let extractor = ContextExtractor::new(cfg.extraction.clone(), layout);

    Ok(extractor.extract(&page, selected, anchor, &fallback))
}

async fn run_chat(cfg: &Config) -> Result<()> {
    let backend = HttpChatBackend::new(&cfg.chat, cfg.api.timeout_secs)?;
    let mut widget = ChatWidget::new(&cfg.chat);
    widget.toggle();

    println!("Chat open. Enter sends, a trailing \\ continues the line, /quit exits.");
    for message in widget.messages().as_slice() {
        println!("bot> {}", message.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if widget.draft().is_empty() && line.trim() == "/quit" {
            break;
        }

        let (body, key) = match line.strip_suffix('\\') {
            Some(body) => (body, Key::ShiftEnter),
            None => (line.as_str(), Key::Enter),
        };
        for c in body.chars() {
            widget.handle_key(Key::Char(c));
        }
        if widget.handle_key(key) != KeyOutcome::Submit {
            continue;
        }

        // Ctrl-C abandons the in-flight request.
        let (handle, mut cancel) = cancellation();
        let watcher = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                handle.cancel();
            }
        });
        let before = widget.messages().len();
        widget.submit(&backend, &mut cancel).await;
        watcher.abort();

        for message in &widget.messages().as_slice()[before..] {
            if message.sender == Sender::Bot {
                println!("bot> {}", message.text);
            }
        }
    }

    Ok(())
}
