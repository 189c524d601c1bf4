use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tokio::net::TcpListener;
use tracing::info;

use draftsmith::config::{self, Config, ProviderCredentials};
use draftsmith::llm::ProviderChain;
use draftsmith::router::RpcRouter;
use draftsmith::server::{self, AppState};
use draftsmith::service::GenerationService;
use draftsmith_protocol::RpcRequest;

/// Draftsmith - design document generation over RPC
#[derive(Parser)]
#[command(name = "draftsmith")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Override server.host
        #[arg(long)]
        host: Option<String>,

        /// Override server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Invoke one method in-process and print the response
    Call {
        /// Method name, e.g. ping or generate_data_model
        method: String,

        /// Params as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging()?;

    let config = Config::load(&cli.config)
        .await
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let credentials = ProviderCredentials::from_env();
    let chain = ProviderChain::from_credentials(&credentials, &config.providers);
    let router = RpcRouter::new(GenerationService::new(chain));

    match cli.command {
        Command::Serve { host, port } => {
            let host = host.unwrap_or(config.server.host);
            let port = port.unwrap_or(config.server.port);
            let app = server::build_app(AppState { router }, config.server.request_timeout_seconds);

            let addr = format!("{host}:{port}");
            let listener = TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            info!(%addr, "Listening");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;
        }
        Command::Call { method, params } => {
            let params: Value =
                serde_json::from_str(&params).context("--params must be valid JSON")?;
            let response = router.handle(RpcRequest::new(method, params)).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
            if response.is_error() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

fn init_logging() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("draftsmith=info"))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}
