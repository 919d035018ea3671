//! RAG Server binary
//!
//! Run with: cargo run -p secop-rag --bin secop-rag-server [config.toml]

use std::path::PathBuf;

use secop_rag::{config::RagConfig, providers::VectorizerMode, server::RagServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "secop_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                        SECOP RAG                          ║
║        Semantic Retrieval over Procurement Records        ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - Database: {}", config.storage.database_path.display());
    tracing::info!("  - Embedding dimensions: {}", config.embeddings.dimensions);
    tracing::info!(
        "  - Chunk windows: documents {}/{}, records {}/{}",
        config.chunking.document.max_chars,
        config.chunking.document.overlap,
        config.chunking.record.max_chars,
        config.chunking.record.overlap
    );
    match config.vectorizer_mode() {
        VectorizerMode::Provider(p) => tracing::info!("  - Embedding model: {} ({})", p.model, p.base_url),
        VectorizerMode::Fallback(_) => {
            tracing::warn!("OPENAI_API_KEY not set, using hash-seeded fallback vectors");
            tracing::warn!("Fallback vectors match exact text only; set a key for semantic search");
        }
    }

    // Create and start server
    let server = RagServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/records   - Ingest records");
    println!("  POST /api/documents - Ingest a text document");
    println!("  POST /api/query     - Ask questions");
    println!("  GET  /api/entries   - List entries");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
