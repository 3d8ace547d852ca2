//! rebillable web server entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rebillable_core::{TracingConfig, TracingOutputFormat, init_tracing};
use rebillable_providers::freeagent::FreeAgentProvider;
use tracing::{Level, info};

use rebillable_server::cli::Cli;
use rebillable_server::config::FileConfig;
use rebillable_server::error::ServerResult;
use rebillable_server::server::WebServer;
use rebillable_server::signals::ShutdownHandle;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut tracing_config = TracingConfig::server();
    if cli.debug {
        tracing_config = tracing_config.with_level(Level::DEBUG);
    }
    if cli.json_logs {
        tracing_config = tracing_config.with_format(TracingOutputFormat::Json);
    }
    if let Err(e) = init_tracing(tracing_config) {
        eprintln!("error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let file = match cli.config {
        Some(ref path) => FileConfig::load_from(path)?,
        None => FileConfig::load()?,
    };
    let (server_config, freeagent_config) = cli.apply(file).resolve()?;

    let provider = Arc::new(FreeAgentProvider::new(freeagent_config)?);
    let server = WebServer::bind(&server_config, provider).await?;
    info!(
        "rebillable {} ready at {}",
        env!("CARGO_PKG_VERSION"),
        server_config.public_url
    );

    let shutdown = ShutdownHandle::new();
    shutdown.spawn_listener();
    server.run(shutdown).await
}
