//! Retrieval-grounded documentation agent.
//!
//! Docent answers questions about a private text corpus. Documents are split
//! into overlapping chunks, embedded, and stored in SQLite with
//! [sqlite-vec](https://github.com/asg017/sqlite-vec) for similarity search.
//! A conversation is driven by a bounded think-act-observe loop: the model
//! either answers directly or asks for the `search_documentation` tool, and
//! the retrieved passages are fed back for a grounded answer.
//!
//! # Architecture
//!
//! - **Storage**: SQLite with a vec0 cosine index, one row per chunk
//! - **Embeddings / generation**: Ollama over blocking HTTP, behind traits
//! - **Tool calls**: JSON objects parsed out of the model's free text
//! - **Memory**: per-conversation message log with count and token bounds
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite initialization, schema, migrations, and health checks
//! - [`chunker`]: Paragraph-aware chunking with overlap
//! - [`embedding`] / [`generation`]: Model gateways
//! - [`store`]: Chunk storage, similarity search, neighbor expansion
//! - [`ingest`]: Raw text to stored chunks, idempotently
//! - [`conversation`]: Bounded conversation memory
//! - [`tools`]: Tool trait, registry, call extraction, and the search tool
//! - [`agent`]: The per-turn agent loop
//! - [`service`]: Multi-conversation facade

pub mod agent;
pub mod chunker;
pub mod config;
pub mod conversation;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod service;
pub mod store;
pub mod tools;

pub use error::{RagError, RagResult};
