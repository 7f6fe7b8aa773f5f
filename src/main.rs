//! # GymPro CLI
//!
//! ```bash
//! gympro --config ./config/gympro.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `gympro serve` | Start the HTTP chat server |
//! | `gympro ask "<question>"` | Initialize the pipeline and answer one question |
//! | `gympro status` | Print the offline configuration checks |

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use gympro::config::load_config;
use gympro::coordinator::QueryCoordinator;
use gympro::orchestrator::RetrievalOrchestrator;
use gympro::server::run_server;

/// GymPro — a retrieval-augmented fitness assistant.
#[derive(Parser)]
#[command(
    name = "gympro",
    about = "GymPro — a retrieval-augmented fitness assistant",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/gympro.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP chat server.
    ///
    /// The RAG pipeline initializes in the background; until it is ready,
    /// answers come from the fallback responder.
    Serve,

    /// Answer one question from the command line.
    ///
    /// Initializes the pipeline first. If initialization fails the answer
    /// falls back to canned guidance, exactly as the server would.
    Ask {
        /// The question to ask.
        message: String,
    },

    /// Print the configuration checks without starting anything.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gympro=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(load_config(&cli.config)?);

    match cli.command {
        Commands::Serve => run_server(config).await,
        Commands::Ask { message } => ask(config, &message).await,
        Commands::Status => status(config),
    }
}

async fn ask(config: Arc<gympro::config::Config>, message: &str) -> Result<()> {
    let orchestrator = Arc::new(RetrievalOrchestrator::new(config.clone()));
    if let Err(e) = orchestrator.initialize().await {
        eprintln!("RAG initialization failed ({}); using fallback mode", e);
    }

    let coordinator = QueryCoordinator::new(config, orchestrator);
    let outcome = coordinator.handle(message).await?;

    println!("{}", outcome.response);
    if !outcome.sources.is_empty() {
        println!();
        println!("Sources:");
        for (i, source) in outcome.sources.iter().enumerate() {
            println!("  {}. {}", i + 1, source);
        }
    }
    Ok(())
}

fn status(config: Arc<gympro::config::Config>) -> Result<()> {
    let corpus_exists = config.corpus.path.exists();
    println!(
        "corpus file:        {} ({})",
        config.corpus.path.display(),
        if corpus_exists { "found" } else { "missing" }
    );
    println!(
        "credentials:        {}",
        if config.credentials_configured() {
            "configured"
        } else {
            "missing"
        }
    );
    println!("embedding provider: {}", config.embedding.provider);
    println!("generation model:   {}", config.generation.model);
    println!(
        "chunking:           size {} / overlap {}",
        config.chunking.chunk_size, config.chunking.overlap
    );
    println!("top-k:              {}", config.retrieval.top_k);
    Ok(())
}
