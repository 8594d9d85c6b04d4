//! CLI command definitions for the `mxbridge` binary.
//!
//! Every connection setting can come from a flag or from the environment
//! (including a `.env` file in the working directory).

pub mod listen;
pub mod serve;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use mxbridge_infra::config::BridgeSettings;

/// Bridge HTTP clients to a Matrix homeserver.
#[derive(Parser)]
#[command(name = "mxbridge", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and serve the HTTP gateway.
    Serve(ServeArgs),

    /// Log in and print incoming room messages until interrupted.
    Listen(ConnectionArgs),

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

/// Homeserver account settings shared by every command that logs in.
#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// Homeserver base URL, e.g. https://matrix.example.org.
    #[arg(long, env = "MATRIX_HOMESERVER")]
    pub homeserver: Option<String>,

    /// Account localpart or full user id.
    #[arg(long, env = "MATRIX_USERNAME")]
    pub username: Option<String>,

    /// Account password.
    #[arg(long, env = "MATRIX_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Display name for the device created at login.
    #[arg(long, env = "MXBRIDGE_DEVICE_NAME")]
    pub device_name: Option<String>,

    /// Long-poll timeout for each sync round, in milliseconds.
    #[arg(long, env = "MXBRIDGE_SYNC_TIMEOUT_MS")]
    pub sync_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Address the HTTP gateway listens on.
    #[arg(long, env = "MXBRIDGE_BIND")]
    pub bind: Option<String>,

    /// Directory holding the built web frontend.
    #[arg(long, env = "MXBRIDGE_WEB_DIR")]
    pub web_dir: Option<PathBuf>,

    /// Also run the sync loop and log incoming messages.
    #[arg(long, env = "MXBRIDGE_LISTEN")]
    pub listen: bool,
}

impl ConnectionArgs {
    pub fn into_settings(self) -> BridgeSettings {
        BridgeSettings {
            homeserver: self.homeserver,
            username: self.username,
            password: self.password,
            sync_timeout_ms: self.sync_timeout_ms,
            device_name: self.device_name,
            ..Default::default()
        }
    }
}

impl ServeArgs {
    pub fn into_settings(self) -> BridgeSettings {
        BridgeSettings {
            bind: self.bind,
            web_dir: self.web_dir,
            listen: self.listen,
            ..self.connection.into_settings()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_become_settings() {
        let cli = Cli::try_parse_from([
            "mxbridge",
            "-v",
            "serve",
            "--homeserver",
            "https://matrix.example.org",
            "--username",
            "bridge",
            "--password",
            "hunter2",
            "--bind",
            "0.0.0.0:8080",
            "--listen",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let settings = args.into_settings();
        assert_eq!(settings.homeserver.as_deref(), Some("https://matrix.example.org"));
        assert_eq!(settings.username.as_deref(), Some("bridge"));
        assert_eq!(settings.bind.as_deref(), Some("0.0.0.0:8080"));
        assert!(settings.listen);
    }

    #[test]
    fn listen_accepts_connection_flags() {
        let cli = Cli::try_parse_from([
            "mxbridge",
            "listen",
            "--homeserver",
            "https://matrix.example.org",
            "--sync-timeout-ms",
            "1000",
        ])
        .unwrap();

        let Commands::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        let settings = args.into_settings();
        assert_eq!(settings.sync_timeout_ms, Some(1000));
        assert!(!settings.listen);
    }
}
