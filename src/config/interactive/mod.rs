
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, EmbeddingConfig, EmbeddingProvider, RetrievalConfig};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 First Aid RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir)?;

    eprintln!("{}", style("Embedding Configuration").bold().yellow());
    eprintln!("The same model must be used for ingestion and for answering questions.");
    eprintln!();

    configure_embedding(&mut config)?;

    if config.embedding.provider == EmbeddingProvider::Ollama {
        eprintln!();
        eprintln!("{}", style("Testing configuration...").yellow());

        if test_ollama_connection(&config.embedding)? {
            eprintln!("{}", style("✓ Ollama connection successful!").green());
        } else {
            eprintln!(
                "{}",
                style("⚠ Warning: Could not connect to Ollama").yellow()
            );
            eprintln!("You can continue, but make sure Ollama is running before ingesting.");
        }
    }

    eprintln!();
    eprintln!("{}", style("Retrieval Policy").bold().yellow());
    eprintln!("Answers whose nearest distance exceeds the threshold are withheld.");
    eprintln!();

    configure_retrieval(&mut config.retrieval)?;

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
        eprintln!(
            "{}",
            style("Changing the model requires re-running `firstaid-rag ingest`.").dim()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Embedding Settings:").bold().yellow());
    eprintln!("  Provider: {}", style(config.embedding.provider).cyan());
    eprintln!("  Model: {}", style(&config.embedding.model).cyan());
    eprintln!("  Batch Size: {}", style(config.embedding.batch_size).cyan());
    if config.embedding.provider == EmbeddingProvider::Ollama {
        match config.embedding.ollama_url() {
            Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
            Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
        }
    }

    eprintln!();
    eprintln!("{}", style("Corpus:").bold().yellow());
    eprintln!(
        "  Data Directory: {}",
        style(config.corpus_dir().display()).cyan()
    );
    eprintln!("  Tabular: {}", style(&config.corpus.tabular_file).cyan());
    eprintln!("  Paged: {}", style(&config.corpus.paged_file).cyan());
    eprintln!("  Plain Text: {}", style(&config.corpus.plain_file).cyan());
    eprintln!("  Source Tag: {}", style(&config.corpus.source_tag).cyan());

    eprintln!();
    eprintln!("{}", style("Retrieval:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Distance Threshold: {}",
        style(config.retrieval.distance_threshold).cyan()
    );
    eprintln!(
        "  Snippet Length: {}",
        style(config.retrieval.snippet_chars).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Server:").bold().yellow());
    eprintln!(
        "  Bind Address: {}",
        style(config.server.bind_address()).cyan()
    );

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );
    eprintln!("Index: {}", style(config.index_path().display()).dim());
    eprintln!(
        "Text table: {}",
        style(config.text_table_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config(config_dir: &Path) -> Result<Config> {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Ok(Config::with_base_dir(config_dir))
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_embedding(config: &mut Config) -> Result<()> {
    let providers: Vec<&str> = EmbeddingProvider::ALL.iter().map(|p| p.as_str()).collect();
    let default_index = EmbeddingProvider::ALL
        .iter()
        .position(|&p| p == config.embedding.provider)
        .unwrap_or(0);

    let provider_index = Select::new()
        .with_prompt("Embedding provider")
        .default(default_index)
        .items(&providers)
        .interact()?;
    config.switch_provider(EmbeddingProvider::ALL[provider_index])?;
    let embedding = &mut config.embedding;

    if embedding.provider == EmbeddingProvider::Ollama {
        let protocols = &["http", "https"];
        let default_index = protocols
            .iter()
            .position(|&p| p == embedding.protocol)
            .unwrap_or(0);

        let protocol_index = Select::new()
            .with_prompt("Ollama protocol")
            .default(default_index)
            .items(protocols)
            .interact()?;
        let protocol = protocols[protocol_index].to_string();

        let host: String = Input::new()
            .with_prompt("Ollama host")
            .default(embedding.host.clone())
            .validate_with(|input: &String| -> Result<(), ConfigError> {
                let candidate = EmbeddingConfig {
                    protocol: protocol.clone(),
                    host: input.clone(),
                    ..EmbeddingConfig::default()
                };
                candidate.ollama_url()?;
                Ok(())
            })
            .interact_text()?;

        let port: u16 = Input::new()
            .with_prompt("Ollama port")
            .default(embedding.port)
            .validate_with(|input: &u16| -> Result<(), &str> {
                if *input == 0 {
                    Err("Port must be greater than 0")
                } else {
                    Ok(())
                }
            })
            .interact_text()?;

        embedding.set_protocol(protocol)?;
        embedding.set_port(port)?;
        embedding.set_host(host)?;
    }

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(embedding.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let batch_size: u32 = Input::new()
        .with_prompt("Batch size for embedding generation")
        .default(embedding.batch_size)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if *input == 0 {
                Err("Batch size must be greater than 0")
            } else if *input > 1000 {
                Err("Batch size must be 1000 or less")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    embedding.set_model(model)?;
    embedding.set_batch_size(batch_size)?;

    if embedding.provider == EmbeddingProvider::Hash {
        let dimension: u32 = Input::new()
            .with_prompt("Embedding dimension")
            .default(embedding.embedding_dimension)
            .validate_with(|input: &u32| -> Result<(), &str> {
                if (64..=4096).contains(input) {
                    Ok(())
                } else {
                    Err("Dimension must be between 64 and 4096")
                }
            })
            .interact_text()?;
        embedding.set_embedding_dimension(dimension)?;
    }

    Ok(())
}

fn configure_retrieval(retrieval: &mut RetrievalConfig) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Results per question (top k)")
        .default(retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Top k must be between 1 and 50")
            }
        })
        .interact_text()?;

    let threshold: f32 = Input::new()
        .with_prompt("Abstention distance threshold")
        .default(retrieval.distance_threshold)
        .validate_with(|input: &f32| -> Result<(), &str> {
            if input.is_finite() && *input > 0.0 {
                Ok(())
            } else {
                Err("Threshold must be a positive number")
            }
        })
        .interact_text()?;

    retrieval.set_top_k(top_k)?;
    retrieval.set_distance_threshold(threshold)?;

    Ok(())
}

fn test_ollama_connection(embedding: &EmbeddingConfig) -> Result<bool> {
    let url = format!(
        "{}://{}:{}/api/version",
        embedding.protocol, embedding.host, embedding.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => Ok(true),
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => Ok(true),
        Err(_) => Ok(false),
    }
}
