//! `mxbridge serve` - log in once, then run the HTTP gateway.

use anyhow::Context;
use tracing::info;

use mxbridge_core::session::{spawn_session, LogSink, SessionManager, WorkerOptions};
use mxbridge_infra::config::BridgeConfig;
use mxbridge_infra::matrix::{MatrixClient, MatrixProxy};

use crate::http;
use crate::state::AppState;

pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let client = MatrixClient::new(config.homeserver.clone()).with_device_name(&config.device_name);
    let mut manager = SessionManager::new(client)
        .with_sink(LogSink)
        .with_sync_timeout(config.sync_timeout);

    let session_info = manager
        .connect(&config.credentials)
        .await
        .with_context(|| format!("failed to log in to {}", config.homeserver))?;
    info!(user_id = %session_info.user_id, homeserver = %config.homeserver, "connected to homeserver");

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    let (session, worker) = spawn_session(
        manager,
        WorkerOptions {
            listen: config.listen,
            ..Default::default()
        },
    );
    let state = AppState::new(session.clone(), MatrixProxy::new(config.homeserver.clone()));
    let router = http::router::build_router(state, &config.web_dir);

    println!(
        "  {} mxbridge listening on {} as {}",
        console::style("⚡").bold(),
        console::style(format!("http://{}", config.bind)).cyan(),
        console::style(&session_info.user_id).green()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    axum::serve(listener, router)
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;

    session.shutdown().await;
    if let Err(e) = worker.await {
        tracing::warn!("session worker ended abnormally: {e}");
    }

    println!("\n  Server stopped.");
    Ok(())
}
