//! # pdf-rag
//!
//! Retrieval-augmented question answering over a folder of PDFs.
//!
//! The pipeline has three stages, each usable on its own:
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────┐
//! │ pdf_files│──▶│   extract    │──▶│    index     │──▶│  SQLite  │
//! │  *.pdf   │   │ combined.txt │   │ split+embed  │   │ vectors  │
//! └──────────┘   └──────────────┘   └──────────────┘   └────┬─────┘
//!                                                           │
//!                      question ──▶ ┌──────────────┐ ◀──────┘
//!                                   │    query     │──▶ answer
//!                                   │ retrieve+LLM │
//!                                   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! rag extract                       # pdf_files/*.pdf -> extracted_text/combined_text.txt
//! rag index                         # chunk, embed, store in collection "myRag"
//! rag ask "What is the top speed?"  # retrieve context and ask the model
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Typed pipeline errors |
//! | [`extract`] | PDF text extraction stage |
//! | [`chunk`] | Recursive character text splitting |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector store trait, SQLite and in-memory backends |
//! | [`index`] | Chunking and indexing stage |
//! | [`llm`] | Language model boundary |
//! | [`prompt`] | System prompt assembly |
//! | [`query`] | Retrieval and answering stage |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod collections;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod http;
pub mod index;
pub mod llm;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod query;
pub mod store;
