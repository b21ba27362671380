//! lintel CLI — the service entry point.
//!
//! Commands:
//! - `serve`  — start the HTTP gateway
//! - `doctor` — probe the retrieval backend and LLM endpoint

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "lintel",
    about = "lintel — building-regulations assistant service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Diagnose connectivity to the retrieval backend and LLM endpoint
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let mut config = lintel_config::AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            // ConfigurationError is fatal: refuse to serve.
            config.validate()?;
            lintel_gateway::start(config).await?;
        }
        Commands::Doctor => doctor(config).await,
    }

    Ok(())
}

async fn doctor(config: lintel_config::AppConfig) {
    println!("lintel doctor");
    println!("  llm endpoint:      {}", config.llm.base_url);
    println!("  llm model:         {}", config.llm.model);
    println!("  retrieval backend: {}", config.retrieval.base_url);

    match config.validate() {
        Ok(()) => println!("  config:            ok"),
        Err(e) => println!("  config:            INVALID — {e}"),
    }

    let retrieval = lintel_retrieval::RetrievalGateway::new(&config.retrieval);
    let probe = retrieval.probe().await;
    println!(
        "  vector index:      {}",
        match (probe.reachable, probe.index_non_empty) {
            (true, true) => "reachable, indexed documents present",
            (true, false) => "reachable, but the index is EMPTY — run ingestion first",
            (false, _) => "UNREACHABLE",
        }
    );

    if config.llm.api_key.is_some() {
        use lintel_core::provider::{LlmProvider, LlmRequest};
        use lintel_core::message::Message;

        let provider = lintel_providers::build_from_config(&config.llm);
        let request = LlmRequest {
            model: config.llm.model.clone(),
            messages: vec![Message::user("ping")],
            temperature: 0.0,
            max_tokens: Some(1),
            tools: Vec::new(),
        };
        match provider.complete(request).await {
            Ok(_) => println!("  llm:               reachable"),
            Err(e) => println!("  llm:               FAILED — {e}"),
        }
    } else {
        println!("  llm:               no API key configured");
    }
}
