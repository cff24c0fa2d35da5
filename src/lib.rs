//! # paperdex
//!
//! A local-first knowledge base and Q&A pipeline for a personal
//! research-paper library.
//!
//! paperdex reads a reference-manager manifest of PDF papers, extracts
//! structured knowledge from each paper with a language model, indexes paper
//! content into a SQLite-backed vector store, and answers free-form questions
//! against the indexed corpus.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │  Manifest +  │──▶│   Pipeline   │──▶│  SQLite   │
//! │  PDF library │   │ Chunk+Embed  │   │  vectors  │
//! └──────────────┘   └──────────────┘   └─────┬─────┘
//!        │                                    │
//!        ▼                                    ▼
//! ┌──────────────┐                      ┌───────────┐
//! │ Batch LLM    │                      │ Retrieval │
//! │ extract/     │                      │ + grounded│
//! │ analyze      │                      │  answers  │
//! └──────────────┘                      └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`manifest`] | Library manifest loading + filename edge cases |
//! | [`metadata`] | Cached bibliographic metadata |
//! | [`loader`] | PDF text extraction |
//! | [`chunk`] | Semantic chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index + document store |
//! | [`ingest`] | Knowledge ingestion service |
//! | [`search`] | Semantic retrieval |
//! | [`llm`] | Chat model abstraction |
//! | [`answer`] | Grounded answer synthesis |
//! | [`batch`] | Batch extraction/analysis orchestrator |
//! | [`analysis`] | Analysis response validation |
//! | [`artifacts`] | Atomic output artifacts |

pub mod analysis;
pub mod answer;
pub mod artifacts;
pub mod batch;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod loader;
pub mod manifest;
pub mod metadata;
pub mod models;
pub mod prompts;
pub mod search;
