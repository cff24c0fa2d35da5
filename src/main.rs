//! # paperdex CLI (`pdx`)
//!
//! ```bash
//! pdx --config ./config/pdx.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdx init` | Create the SQLite database and the vector collection |
//! | `pdx ingest` | Index the library manifest (chunk + embed + upsert) |
//! | `pdx search "<query>"` | Semantic search over indexed chunks |
//! | `pdx ask "<question>"` | One-shot grounded answer |
//! | `pdx chat` | Interactive Q&A loop (`exit`/`bye` quits) |
//! | `pdx extract` | Batch structured extraction over the manifest |
//! | `pdx analyze` | Batch narrative analysis over the manifest |

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use paperdex::answer::Synthesizer;
use paperdex::batch::{BatchRunner, PipelineKind};
use paperdex::config::{self, Config};
use paperdex::db;
use paperdex::embedding::OpenAiEmbedder;
use paperdex::index::VectorIndex;
use paperdex::ingest::Ingestor;
use paperdex::llm::OpenAiChat;
use paperdex::manifest;
use paperdex::metadata::MetadataCache;
use paperdex::search::Retrieval;

/// paperdex — a local-first knowledge base and Q&A pipeline for a personal
/// research-paper library.
#[derive(Parser)]
#[command(
    name = "pdx",
    about = "paperdex — knowledge base and Q&A pipeline for a research-paper library",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pdx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and vector collection. Idempotent.
    Init,

    /// Ingest the library manifest into the vector index.
    Ingest {
        /// Reprocess documents even if they are already indexed.
        #[arg(long)]
        reindex: bool,
    },

    /// Semantic search over indexed chunks.
    Search {
        /// The search query string.
        query: String,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Ask one question and print the grounded answer.
    Ask {
        /// The question to answer from the library.
        question: String,
    },

    /// Interactive question-answering loop.
    Chat,

    /// Run structured extraction across the manifest.
    Extract,

    /// Run narrative analysis across the manifest.
    Analyze,
}

/// Flips the cancellation flag on Ctrl-C; the batch loops notice it between
/// manifest items.
fn spawn_cancel_handler() -> Arc<AtomicBool> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("interrupt received, finishing current document");
            flag.store(true, Ordering::Relaxed);
        }
    });
    cancel
}

async fn open_index(cfg: &Config) -> Result<VectorIndex> {
    let pool = db::connect(&cfg.db.path).await?;
    let index = VectorIndex::open(pool, &cfg.db.collection, cfg.embedding.dims).await?;
    Ok(index)
}

fn build_embedder(cfg: &Config) -> Result<OpenAiEmbedder> {
    let api_key = cfg.llm.api_key()?;
    Ok(OpenAiEmbedder::new(&cfg.embedding, api_key)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            open_index(&cfg).await?;
            println!("Database initialized successfully.");
        }

        Commands::Ingest { reindex } => {
            let index = open_index(&cfg).await?;
            let embedder = build_embedder(&cfg)?;
            let cache = MetadataCache::new(&cfg.library.metadata_cache_dir);
            let entries =
                manifest::load_manifest(&cfg.library.manifest, &cfg.library.manifest_encoding)?;
            let cancel = spawn_cancel_handler();

            let ingestor = Ingestor::new(&index, &embedder, &cache, &cfg);
            let report = ingestor.ingest(&entries, !reindex, &cancel).await?;

            println!("ingest");
            println!("  manifest entries: {}", entries.len());
            println!("  indexed: {}", report.indexed);
            println!("  skipped (already indexed): {}", report.skipped);
            println!("  failed: {}", report.failures.len());
            for (pdf_name, error) in &report.failures {
                println!("    {}: {}", pdf_name, error);
            }
            if report.cancelled {
                println!("  cancelled before completion");
            }
            println!("ok");
        }

        Commands::Search { query, limit } => {
            let index = open_index(&cfg).await?;
            let embedder = build_embedder(&cfg)?;
            let retrieval = Retrieval::new(&index, &embedder);

            let k = limit.unwrap_or(cfg.retrieval.top_k);
            let results = retrieval.search(&query, k).await?;

            if results.is_empty() {
                println!("No results.");
                return Ok(());
            }

            for (i, result) in results.iter().enumerate() {
                let title = result.title.as_deref().unwrap_or(&result.pdf_name);
                println!("{}. [{:.3}] {}", i + 1, result.score, title);
                println!("    part: {}", result.chunk_index);
                println!(
                    "    excerpt: \"{}\"",
                    truncate(&result.text.replace('\n', " "), 160)
                );
                println!();
            }
        }

        Commands::Ask { question } => {
            let index = open_index(&cfg).await?;
            let embedder = build_embedder(&cfg)?;
            let chat = OpenAiChat::new(&cfg.llm)?;
            let retrieval = Retrieval::new(&index, &embedder);
            let synthesizer = Synthesizer::new(retrieval, &chat, &cfg.retrieval);

            let reply = synthesizer.answer(&question).await?;
            println!("{}", reply);
        }

        Commands::Chat => {
            let index = open_index(&cfg).await?;
            let embedder = build_embedder(&cfg)?;
            let chat = OpenAiChat::new(&cfg.llm)?;
            let retrieval = Retrieval::new(&index, &embedder);
            let synthesizer = Synthesizer::new(retrieval, &chat, &cfg.retrieval);

            paperdex::chat::run_chat(&synthesizer).await?;
        }

        Commands::Extract => {
            run_llm_batch(&cfg, PipelineKind::Extraction).await?;
        }

        Commands::Analyze => {
            run_llm_batch(&cfg, PipelineKind::Analysis).await?;
        }
    }

    Ok(())
}

async fn run_llm_batch(cfg: &Config, kind: PipelineKind) -> Result<()> {
    let chat = OpenAiChat::new(&cfg.llm)?;
    let cache = MetadataCache::new(&cfg.library.metadata_cache_dir);
    let entries = manifest::load_manifest(&cfg.library.manifest, &cfg.library.manifest_encoding)?;
    let cancel = spawn_cancel_handler();

    let runner = BatchRunner::new(&chat, &cache, cfg);
    let report = runner.run_batch(&entries, kind, &cancel).await?;

    let label = match kind {
        PipelineKind::Extraction => "extract",
        PipelineKind::Analysis => "analyze",
    };
    println!("{}", label);
    println!("  manifest entries: {}", entries.len());
    println!("  processed: {}", report.done);
    println!("  skipped (artifact exists): {}", report.skipped);
    println!("  failed: {}", report.failures.len());
    for (pdf_name, error) in &report.failures {
        println!("    {}: {}", pdf_name, error);
    }
    if report.cancelled {
        println!("  cancelled before completion");
    }
    println!("ok");
    Ok(())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.trim().to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}
