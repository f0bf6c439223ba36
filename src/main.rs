//! # pdf-rag CLI (`rag`)
//!
//! Runs the extraction, indexing, and query stages, separately or end to end.
//!
//! ## Usage
//!
//! ```bash
//! rag [--config ./rag.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `rag extract` | Combine the text of every PDF in `pdf_dir` into `output_file` |
//! | `rag index` | Chunk and embed `output_file` into the configured collection |
//! | `rag ask "<question>"` | Answer a question from the collection |
//! | `rag run "<question>"` | `extract`, then `index`, then `ask` |
//! | `rag collections list` | Show collections and entry counts |
//! | `rag collections delete <name>` | Drop a collection |
//!
//! Without `--config` the built-in defaults are used: PDFs from `pdf_files/`,
//! text to `extracted_text/combined_text.txt`, vectors in `data/rag.sqlite`,
//! and Ollama at `http://localhost:11434` for both embeddings and answers.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use pdf_rag::{collections, config, extract, index, logging, query};

/// Ask questions about a folder of PDFs.
#[derive(Parser)]
#[command(
    name = "rag",
    about = "Extract text from PDFs, index it, and answer questions about it",
    version,
    long_about = "pdf-rag extracts the text of every PDF in a directory, splits it into \
    overlapping chunks, embeds them into a local SQLite vector store, and answers questions \
    by handing the closest chunks to a language model."
)]
struct Cli {
    /// Path to a configuration file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Override `store.collection`.
    #[arg(long, global = true)]
    collection: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text from every `*.pdf` in the input directory.
    ///
    /// Writes one combined file in which each document starts with a
    /// `File: <name>` line. Unreadable PDFs are reported and skipped.
    Extract,

    /// Chunk, embed, and store the combined text file.
    ///
    /// Creates the collection if needed. Re-running appends again unless
    /// `store.on_duplicate = "skip"`.
    Index,

    /// Answer a question from an indexed collection.
    Ask {
        /// The question to answer.
        question: String,

        /// Number of chunks to retrieve (overrides `retrieval.k`).
        #[arg(short, long)]
        k: Option<usize>,

        /// Print the answer with its context as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Run extract, index, and ask in sequence.
    Run {
        /// The question to answer.
        question: String,

        /// Print the answer with its context as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Inspect or remove collections.
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },
}

#[derive(Subcommand)]
enum CollectionsAction {
    /// List collections with their entry counts.
    List,
    /// Delete a collection and all its entries.
    Delete {
        /// Collection name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level);

    let mut cfg = config::load_or_default(cli.config.as_deref())?;
    if let Some(name) = cli.collection {
        cfg.store.collection = name;
        config::validate(&cfg)?;
    }

    match cli.command {
        Commands::Extract => {
            extract::run_extract(&cfg)?;
        }
        Commands::Index => {
            index::run_index(&cfg).await?;
        }
        Commands::Ask { question, k, json } => {
            if let Some(k) = k {
                cfg.retrieval.k = k;
                config::validate(&cfg)?;
            }
            query::run_ask(&cfg, &question, json).await?;
        }
        Commands::Run { question, json } => {
            extract::run_extract(&cfg)?;
            index::run_index(&cfg).await?;
            query::run_ask(&cfg, &question, json).await?;
        }
        Commands::Collections { action } => match action {
            CollectionsAction::List => {
                collections::run_list(&cfg).await?;
            }
            CollectionsAction::Delete { name } => {
                collections::run_delete(&cfg, &name).await?;
            }
        },
    }

    Ok(())
}
