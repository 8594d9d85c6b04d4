//! Bridge configuration resolution.
//!
//! The CLI layer collects raw values (flags, environment, `.env`) into
//! [`BridgeSettings`]; [`resolve_bridge_config`] validates them into a
//! [`BridgeConfig`] before anything touches the network.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use mxbridge_types::error::ConfigError;
use mxbridge_types::session::Credentials;

use crate::matrix::client::DEFAULT_DEVICE_NAME;

pub const ENV_HOMESERVER: &str = "MATRIX_HOMESERVER";
pub const ENV_USERNAME: &str = "MATRIX_USERNAME";
pub const ENV_PASSWORD: &str = "MATRIX_PASSWORD";
pub const ENV_BIND: &str = "MXBRIDGE_BIND";

pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_WEB_DIR: &str = "matrix-frontend/build";
pub const DEFAULT_SYNC_TIMEOUT_MS: u64 = 30_000;

/// Raw, unvalidated settings as collected from the command line and environment.
#[derive(Debug, Clone, Default)]
pub struct BridgeSettings {
    pub homeserver: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bind: Option<String>,
    pub web_dir: Option<PathBuf>,
    pub listen: bool,
    pub sync_timeout_ms: Option<u64>,
    pub device_name: Option<String>,
}

/// Validated configuration for one bridge process.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub homeserver: Url,
    pub credentials: Credentials,
    pub bind: SocketAddr,
    pub web_dir: PathBuf,
    pub listen: bool,
    pub sync_timeout: Duration,
    pub device_name: String,
}

/// Treat unset and blank values the same way.
fn required(value: Option<String>, name: &'static str) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_homeserver(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
        name: ENV_HOMESERVER,
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            name: ENV_HOMESERVER,
            reason: format!("unsupported scheme '{}', expected http or https", url.scheme()),
        });
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(ConfigError::Invalid {
            name: ENV_HOMESERVER,
            reason: "URL has no host".to_string(),
        });
    }
    Ok(url)
}

/// Validate raw settings.
///
/// Required: homeserver (an absolute http/https URL), username and password.
/// Everything else falls back to its default.
pub fn resolve_bridge_config(settings: BridgeSettings) -> Result<BridgeConfig, ConfigError> {
    let homeserver = parse_homeserver(&required(settings.homeserver, ENV_HOMESERVER)?)?;
    let username = required(settings.username, ENV_USERNAME)?;
    let password = required(settings.password, ENV_PASSWORD)?;

    let bind_raw = settings.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
    let bind = bind_raw
        .trim()
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::Invalid {
            name: ENV_BIND,
            reason: format!("'{bind_raw}': {e}"),
        })?;

    let device_name = settings
        .device_name
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());

    Ok(BridgeConfig {
        homeserver,
        credentials: Credentials::new(username.trim(), password),
        bind,
        web_dir: settings
            .web_dir
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WEB_DIR)),
        listen: settings.listen,
        sync_timeout: Duration::from_millis(
            settings.sync_timeout_ms.unwrap_or(DEFAULT_SYNC_TIMEOUT_MS),
        ),
        device_name,
    })
}
