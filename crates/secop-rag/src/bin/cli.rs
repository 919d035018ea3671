//! Loader and query CLI
//!
//! Run with: cargo run -p secop-rag --features cli --bin secop-rag -- --help

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use secop_rag::{
    generation::{AnswerGenerator, ContextBundle, ExtractiveAnswerer},
    ingestion::{load_records_file, Ingestor},
    providers::Vectorizer,
    retrieval::Retriever,
    storage::VectorStore,
    RagConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "secop-rag", version, about = "Load procurement records and query them")]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true, env = "SECOP_RAG_CONFIG")]
    config: Option<PathBuf>,

    /// Override the database path
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load records from a JSON file (one object or an array)
    Load {
        /// Path to the JSON file
        file: PathBuf,
        /// Compute passages right after loading
        #[arg(long, default_value_t = false)]
        embed: bool,
    },
    /// Compute passages for every entry that has none
    Embed,
    /// Show store counters
    Stats,
    /// Ask a question against the loaded corpus
    Ask {
        /// The question
        query: String,
        /// Number of passages to retrieve
        #[arg(long, short = 'k')]
        top_k: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secop_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = RagConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(db) = cli.db {
        config.storage.database_path = db;
    }

    let store = VectorStore::open(&config.storage.database_path, config.embeddings.dimensions)
        .with_context(|| format!("failed to open {}", config.storage.database_path.display()))?;
    let vectorizer = Vectorizer::new(config.vectorizer_mode())?;

    match cli.command {
        Command::Load { file, embed } => {
            let records = load_records_file(&file)?;
            println!("Found {} records in {}", style(records.len()).bold(), file.display());

            let ingestor = Ingestor::new(&config.chunking, vectorizer, store)?;
            let report = ingestor.store_records(&records).await?;
            println!(
                "{} Stored {} entries ({} failed)",
                style("✓").green(),
                report.entries_written,
                report.failed
            );

            if embed {
                backfill(&ingestor).await?;
            }
        }
        Command::Embed => {
            let ingestor = Ingestor::new(&config.chunking, vectorizer, store)?;
            backfill(&ingestor).await?;
        }
        Command::Stats => {
            let stats = store.stats()?;
            println!("{}", style("Store statistics").bold().underlined());
            println!("  Entries:               {}", stats.entries);
            println!("  Entries with passages: {}", stats.entries_with_passages);
            println!("  Passages:              {}", stats.passages);
            println!("  Dimensions:            {}", stats.dimensions);
            println!("  Database:              {}", config.storage.database_path.display());
        }
        Command::Ask { query, top_k } => {
            let top_k = top_k.unwrap_or(config.retrieval.default_top_k);
            let retriever = Retriever::new(store, vectorizer);
            let items = retriever.answer_context(&query, top_k).await?;

            for (rank, item) in items.iter().enumerate() {
                println!(
                    "{} {} {}",
                    style(format!("#{}", rank + 1)).cyan(),
                    style(&item.group_id).bold(),
                    style(format!("({:.3})", item.score)).dim()
                );
                println!("   {}", item.matched_text.replace('\n', " | "));
            }

            let bundle = ContextBundle::new(query.clone(), items);
            let answer = ExtractiveAnswerer::from_config(&config.retrieval)
                .generate(&query, &bundle)
                .await?;
            println!("\n{}\n{}", style("Answer").bold().underlined(), answer);
        }
    }

    Ok(())
}

async fn backfill(ingestor: &Ingestor) -> Result<()> {
    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} entries ({eta})")?
            .progress_chars("=> "),
    );

    let written = ingestor
        .backfill_passages_with(|done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        })
        .await?;

    bar.finish_and_clear();
    println!("{} Wrote {} passages", style("✓").green(), written);
    Ok(())
}
