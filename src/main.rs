use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smeduverse_ai::agent::ChatAgent;
use smeduverse_ai::config::Config;
use smeduverse_ai::llm;
use smeduverse_ai::tools::ToolRegistry;
use smeduverse_ai::transport::{cli, http};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SMEDUVERSE_GIT_HASH"),
    ")"
);

#[derive(Parser)]
#[command(name = "smeduverse-relay")]
#[command(author, version, long_version = LONG_VERSION, about = "Smeduverse AI chat relay", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat relay and widget bundle host
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Directory served under /cdn
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Configuration file (default: the user config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Chat with a running relay from the terminal
    Ask {
        /// Message to send; starts an interactive session when omitted
        message: Option<String>,

        /// Relay chat endpoint
        #[arg(short, long, default_value = "http://localhost:3000/api/chat")]
        endpoint: String,

        /// Print the widget markup after each reply
        #[arg(long)]
        render: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "smeduverse_ai=debug,smeduverse_relay=debug"
    } else {
        "smeduverse_ai=info,smeduverse_relay=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
            config,
        } => {
            let mut config = match config {
                Some(path) => Config::load_from(&path)?,
                None => Config::load()?,
            };
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(dir) = static_dir {
                config.server.static_dir = dir;
            }

            if llm::api_key_from_env().is_none() {
                tracing::error!("{} environment variable is required", llm::API_KEY_ENV);
                std::process::exit(1);
            }

            let provider = llm::create_provider(&config.llm).context("Failed to create provider")?;
            tracing::info!(
                "Using provider {} with model {}",
                provider.name(),
                config.llm.model
            );

            let tools = ToolRegistry::with_defaults().with_timeout_secs(config.agent.tool_timeout_secs);
            let agent = ChatAgent::new(provider, Arc::new(tools))
                .with_settings(config.llm.generation_settings())
                .with_max_steps(config.agent.max_steps);

            http::run_http_server(&config, Arc::new(agent)).await?;
        }
        Commands::Ask {
            message,
            endpoint,
            render,
        } => {
            cli::run_ask(&endpoint, message, render).await?;
        }
    }

    Ok(())
}
