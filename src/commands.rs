use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use console::style;
use tracing::{error, info};

use crate::config::{Config, EmbeddingProvider};
use crate::embeddings::{OllamaClient, create_embedder};
use crate::index::ArtifactStore;
use crate::ingest::Ingestor;
use crate::loader::SourceStatus;
use crate::retrieval::ServingContext;
use crate::server;

fn load_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir)
        .with_context(|| format!("Failed to load configuration from {}", config_dir.display()))
}

/// Build the index and text table from the configured corpus
#[inline]
pub fn run_ingest(config_dir: &Path, data_dir: Option<PathBuf>) -> Result<()> {
    let mut config = load_config(config_dir)?;
    // A command-line directory is relative to the working directory
    if let Some(data_dir) = data_dir {
        config.corpus.data_dir = std::path::absolute(&data_dir).with_context(|| {
            format!("Failed to resolve data directory {}", data_dir.display())
        })?;
    }

    let embedder = create_embedder(&config).context("Failed to initialize embedder")?;
    let report = Ingestor::new(&config, embedder)
        .run()
        .context("Ingestion failed")?;

    println!("{}", style("📚 Sources").bold().yellow());
    for source in &report.sources {
        match &source.status {
            SourceStatus::Loaded => println!(
                "   ✅ {} ({}): {} units",
                source.path.display(),
                source.kind,
                source.units
            ),
            SourceStatus::Missing => {
                println!("   ➖ {} ({}): not found", source.path.display(), source.kind);
            }
            SourceStatus::Failed(message) => println!(
                "   ❌ {} ({}): {}",
                source.path.display(),
                source.kind,
                message
            ),
        }
    }

    println!();
    println!(
        "{}",
        style(format!(
            "✓ Indexed {} units ({} dimensions, {}) in {:.2}s",
            report.total_units,
            report.dimension,
            report.model_id,
            report.elapsed.as_secs_f64()
        ))
        .green()
    );
    println!("   Index: {}", report.index_path.display());
    println!("   Texts: {}", report.text_path.display());

    Ok(())
}

/// Answer a single question and print the response as JSON
#[inline]
pub fn run_ask(config_dir: &Path, question: &str, top_k: Option<usize>) -> Result<()> {
    let config = load_config(config_dir)?;
    let embedder = create_embedder(&config).context("Failed to initialize embedder")?;

    let mut context = ServingContext::load(&config, embedder);
    if let Some(top_k) = top_k {
        context = context.with_top_k(top_k);
    }

    let answer = context.ask(question).context("Failed to answer question")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&answer).context("Failed to serialize answer")?
    );
    Ok(())
}

/// Start the HTTP service, overriding the configured address if requested
#[inline]
pub async fn run_serve(config_dir: &Path, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = load_config(config_dir)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    config
        .server
        .validate()
        .context("Invalid server address")?;

    let context = Arc::new(ServingContext::start(&config));

    info!("Starting HTTP server on {}", config.server.bind_address());
    server::serve(context, &config.server.bind_address())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

/// Print configuration, embedder health and artifact consistency
#[inline]
pub fn show_status(config_dir: &Path) -> Result<()> {
    let config = load_config(config_dir).unwrap_or_else(|e| {
        error!("{:#}", e);
        Config::with_base_dir(config_dir)
    });

    println!("📊 First Aid RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("⚙️  Configuration:");
    println!("   📁 Base directory: {}", config.get_base_dir().display());
    println!("   📂 Data directory: {}", config.corpus_dir().display());
    println!(
        "   🎯 Top K: {}, distance threshold: {}",
        config.retrieval.top_k, config.retrieval.distance_threshold
    );

    println!();
    println!("🤖 Embedder Status:");
    match config.embedding.provider {
        EmbeddingProvider::Ollama => match OllamaClient::new(&config) {
            Ok(client) => match client.health_check() {
                Ok(()) => {
                    println!(
                        "   ✅ Ollama: Connected ({}:{})",
                        config.embedding.host, config.embedding.port
                    );
                    println!("   📋 Model: {}", config.embedding.model);
                }
                Err(e) => println!("   ⚠️  Ollama: Unhealthy - {}", e),
            },
            Err(e) => println!("   ❌ Ollama: Failed to initialize - {}", e),
        },
        EmbeddingProvider::FastEmbed => {
            println!("   🧠 FastEmbed: in-process model {}", config.embedding.model);
        }
        EmbeddingProvider::Hash => println!(
            "   #️⃣  Hash: {} dimensions, no model required",
            config.embedding.embedding_dimension
        ),
    }

    println!();
    println!("🗂️  Index Artifacts:");
    let store = ArtifactStore::from_config(&config);
    for path in [store.index_path(), store.text_path()] {
        if path.exists() {
            println!("   ✅ {}", path.display());
        } else {
            println!("   ❌ {} (missing)", path.display());
        }
    }

    if !store.exists() {
        println!();
        println!("Run 'firstaid-rag ingest' to build the index.");
        return Ok(());
    }

    match store.read_header() {
        Ok(header) => {
            println!(
                "   📊 {} vectors of dimension {}",
                header.count, header.dimension
            );
            println!("   🧮 Built with: {}", header.model_id);
            println!("   🕒 Built at: {}", header.built_at.to_rfc3339());
        }
        Err(e) => println!("   ❌ Failed to read index header: {}", e),
    }

    println!();
    println!("🔍 Index Consistency:");
    let active_model = match create_embedder(&config) {
        Ok(embedder) => embedder.model_id(),
        Err(e) => {
            println!("   ❌ Cannot determine the active model: {}", e);
            return Ok(());
        }
    };

    match store.check_consistency(&active_model) {
        Ok(report) => {
            if report.is_consistent {
                println!("   ✅ Index and text table are consistent");
            } else {
                println!("   ⚠️  Consistency issues found:");
                println!("   {}", report.summary());
            }
            println!(
                "   📊 Header rows: {}, vectors: {}, text rows: {}",
                report.header_rows, report.vector_rows, report.text_rows
            );
        }
        Err(e) => println!("   ❌ Failed to check consistency: {}", e),
    }

    Ok(())
}
