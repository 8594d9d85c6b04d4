//! mxbridge entry point.
//!
//! Binary name: `mxbridge`
//!
//! Loads `.env`, parses CLI arguments, initializes tracing, then logs in to
//! the homeserver and either serves the HTTP gateway or listens for messages.

mod cli;
mod http;
mod state;

use clap::Parser;
use clap_complete::generate;

use mxbridge_infra::config::resolve_bridge_config;
use mxbridge_observe::tracing_setup::{default_filter, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Missing `.env` is fine; variables may come from the real environment.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Shell completions don't need a session
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "mxbridge", &mut std::io::stdout());
        return Ok(());
    }

    init_tracing(default_filter(cli.verbose, cli.quiet), cli.log_json, cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let result = match cli.command {
        Commands::Serve(args) => match resolve_bridge_config(args.into_settings()) {
            Ok(config) => cli::serve::run(config).await,
            Err(e) => Err(e.into()),
        },
        Commands::Listen(args) => match resolve_bridge_config(args.into_settings()) {
            Ok(config) => cli::listen::run(config).await,
            Err(e) => Err(e.into()),
        },
        Commands::Completions { .. } => Ok(()),
    };

    shutdown_tracing();
    result
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
