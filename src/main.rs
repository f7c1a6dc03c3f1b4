use std::path::PathBuf;

use clap::{Parser, Subcommand};
use firstaid_rag::Result;
use firstaid_rag::commands::{run_ask, run_ingest, run_serve, show_status};
use firstaid_rag::config::{get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "firstaid-rag")]
#[command(about = "Answer first aid questions from an indexed set of guidelines")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the index artifacts
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding provider and retrieval policy
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the index from the source documents
    Ingest {
        /// Directory containing the source documents
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Answer one question and print the JSON response
    Ask {
        question: String,
        /// Number of neighbors to retrieve
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Start the HTTP service
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Show configuration, embedder health and index consistency
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = get_config_dir(cli.base_dir.as_deref())
        .map_err(|e| firstaid_rag::RagError::Config(e.to_string()))?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { data_dir } => {
            run_ingest(&config_dir, data_dir)?;
        }
        Commands::Ask { question, top_k } => {
            run_ask(&config_dir, &question, top_k)?;
        }
        Commands::Serve { host, port } => {
            run_serve(&config_dir, host, port).await?;
        }
        Commands::Status => {
            show_status(&config_dir)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn ingest_command() {
        let cli = Cli::try_parse_from(["firstaid-rag", "ingest"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Ingest { data_dir: None }));
            assert!(parsed.base_dir.is_none());
        }
    }

    #[test]
    fn ingest_with_data_dir() {
        let cli = Cli::try_parse_from(["firstaid-rag", "ingest", "--data-dir", "/srv/guides"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ingest { data_dir } = parsed.command {
                assert_eq!(data_dir, Some(PathBuf::from("/srv/guides")));
            }
        }
    }

    #[test]
    fn ask_command_with_top_k() {
        let cli = Cli::try_parse_from([
            "firstaid-rag",
            "ask",
            "How do I treat a burn?",
            "--top-k",
            "5",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Ask { question, top_k } = parsed.command {
                assert_eq!(question, "How do I treat a burn?");
                assert_eq!(top_k, Some(5));
            }
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["firstaid-rag", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn serve_command_with_address() {
        let cli = Cli::try_parse_from([
            "firstaid-rag",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "8080",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Serve { host, port } = parsed.command {
                assert_eq!(host.as_deref(), Some("127.0.0.1"));
                assert_eq!(port, Some(8080));
            }
        }
    }

    #[test]
    fn global_base_dir_after_subcommand() {
        let cli = Cli::try_parse_from(["firstaid-rag", "status", "--base-dir", "/tmp/rag"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status));
            assert_eq!(parsed.base_dir, Some(PathBuf::from("/tmp/rag")));
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["firstaid-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_port_is_rejected() {
        let cli = Cli::try_parse_from(["firstaid-rag", "serve", "--port", "70000"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::ValueValidation);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["firstaid-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["firstaid-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
