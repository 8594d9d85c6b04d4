//! `mxbridge listen` - log in and print incoming text messages.

use anyhow::Context;
use tracing::info;

use mxbridge_core::session::{spawn_session, SessionManager, WorkerOptions};
use mxbridge_infra::config::BridgeConfig;
use mxbridge_infra::matrix::MatrixClient;
use mxbridge_types::event::InboundEvent;

fn print_event(event: &InboundEvent) {
    println!(
        "  {} {}: {}",
        console::style(format!("[{}]", event.display_room())).cyan(),
        console::style(&event.sender).bold(),
        event.body
    );
}

pub async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let client = MatrixClient::new(config.homeserver.clone()).with_device_name(&config.device_name);
    let mut manager = SessionManager::new(client)
        .with_sink(print_event)
        .with_sync_timeout(config.sync_timeout);

    let session_info = manager
        .connect(&config.credentials)
        .await
        .with_context(|| format!("failed to log in to {}", config.homeserver))?;
    info!(user_id = %session_info.user_id, "listening for messages");

    println!(
        "  {} Listening as {} (Ctrl+C to stop)",
        console::style("👂").bold(),
        console::style(&session_info.user_id).green()
    );

    let (session, worker) = spawn_session(
        manager,
        WorkerOptions {
            listen: true,
            ..Default::default()
        },
    );

    crate::shutdown_signal().await;

    session.shutdown().await;
    if let Err(e) = worker.await {
        tracing::warn!("session worker ended abnormally: {e}");
    }
    Ok(())
}
