//! Configuration loading and parsing.
//!
//! Defines the TOML schema and resolves defaults plus environment overrides.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::controller::{ControllerSettings, MAX_VOLUME};
use crate::lavalink::BackendSettings;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_BACKEND_URI: &str = "http://127.0.0.1:2333";
pub const DEFAULT_BACKEND_PASSWORD: &str = "youshallnotpass";
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 10_000;

/// Environment variable overriding `backend.uri`.
pub const ENV_BACKEND_URI: &str = "LAVALINK_URI";
/// Environment variable overriding `backend.password`.
pub const ENV_BACKEND_PASSWORD: &str = "LAVALINK_PASSWORD";

/// Top-level server configuration loaded from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct ServerConfig {
    /// Bind address (host:port).
    pub bind: Option<String>,
    /// Audio node connection.
    pub backend: Option<BackendConfig>,
    /// Playback tunables.
    pub playback: Option<PlaybackConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BackendConfig {
    /// Node base URI (default `http://127.0.0.1:2333`).
    pub uri: Option<String>,
    /// Node password sent in the `Authorization` header.
    pub password: Option<String>,
    /// Node session id, if a relay already completed the handshake.
    pub session_id: Option<String>,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaybackConfig {
    /// Bounded wait for the next track before going idle (default 1000).
    pub advance_timeout_ms: Option<u64>,
    /// Starting volume for new sessions (default 100).
    pub default_volume: Option<u16>,
}

impl ServerConfig {
    /// Load configuration from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("read config {:?}", path))?;
        let cfg = toml::from_str::<ServerConfig>(&raw).with_context(|| format!("parse config {:?}", path))?;
        Ok(cfg)
    }
}

/// Resolve node settings. Values from `env` win over the file.
pub fn backend_from_config(cfg: &ServerConfig, env: impl Fn(&str) -> Option<String>) -> BackendSettings {
    let file = cfg.backend.as_ref();
    let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    let uri = non_empty(env(ENV_BACKEND_URI))
        .or_else(|| non_empty(file.and_then(|b| b.uri.clone())))
        .unwrap_or_else(|| DEFAULT_BACKEND_URI.to_string());
    let password = non_empty(env(ENV_BACKEND_PASSWORD))
        .or_else(|| non_empty(file.and_then(|b| b.password.clone())))
        .unwrap_or_else(|| DEFAULT_BACKEND_PASSWORD.to_string());
    let session_id = non_empty(file.and_then(|b| b.session_id.clone()));
    let timeout_ms = file
        .and_then(|b| b.timeout_ms)
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_MS);

    BackendSettings {
        uri,
        password,
        session_id,
        timeout: Duration::from_millis(timeout_ms),
    }
}

pub fn controller_settings_from_config(cfg: &ServerConfig) -> ControllerSettings {
    let defaults = ControllerSettings::default();
    let Some(playback) = cfg.playback.as_ref() else {
        return defaults;
    };
    ControllerSettings {
        advance_timeout: playback
            .advance_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.advance_timeout),
        default_volume: playback
            .default_volume
            .map(|v| v.min(MAX_VOLUME))
            .unwrap_or(defaults.default_volume),
    }
}

/// Parse an optional bind address from config.
pub fn bind_from_config(cfg: &ServerConfig) -> Result<Option<SocketAddr>> {
    let Some(bind) = cfg.bind.as_deref() else {
        return Ok(None);
    };
    let addr = bind.parse().with_context(|| format!("parse bind {bind}"))?;
    Ok(Some(addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_apply_without_file_or_env() {
        let cfg = ServerConfig::default();

        let backend = backend_from_config(&cfg, no_env);
        let playback = controller_settings_from_config(&cfg);

        assert_eq!(backend.uri, DEFAULT_BACKEND_URI);
        assert_eq!(backend.password, DEFAULT_BACKEND_PASSWORD);
        assert_eq!(backend.session_id, None);
        assert_eq!(playback.advance_timeout, Duration::from_millis(1000));
        assert_eq!(playback.default_volume, 100);
        assert_eq!(bind_from_config(&cfg).unwrap(), None);
    }

    #[test]
    fn file_values_are_parsed() {
        let cfg: ServerConfig = toml::from_str(
            r#"
bind = "127.0.0.1:9000"

[backend]
uri = "http://lavalink:2333"
password = "hunter2"
session_id = "abc"
timeout_ms = 2500

[playback]
advance_timeout_ms = 250
default_volume = 5000
"#,
        )
        .unwrap();

        let backend = backend_from_config(&cfg, no_env);
        let playback = controller_settings_from_config(&cfg);

        assert_eq!(backend.uri, "http://lavalink:2333");
        assert_eq!(backend.password, "hunter2");
        assert_eq!(backend.session_id.as_deref(), Some("abc"));
        assert_eq!(backend.timeout, Duration::from_millis(2500));
        assert_eq!(playback.advance_timeout, Duration::from_millis(250));
        assert_eq!(playback.default_volume, MAX_VOLUME);
        assert_eq!(
            bind_from_config(&cfg).unwrap(),
            Some("127.0.0.1:9000".parse().unwrap())
        );
    }

    #[test]
    fn env_overrides_win_over_file() {
        let cfg: ServerConfig = toml::from_str(
            r#"
[backend]
uri = "http://from-file:2333"
password = "file-secret"
"#,
        )
        .unwrap();
        let env = |key: &str| match key {
            ENV_BACKEND_URI => Some("http://from-env:2333".to_string()),
            ENV_BACKEND_PASSWORD => Some("env-secret".to_string()),
            _ => None,
        };

        let backend = backend_from_config(&cfg, env);

        assert_eq!(backend.uri, "http://from-env:2333");
        assert_eq!(backend.password, "env-secret");
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let cfg = ServerConfig::default();
        let env = |_: &str| Some("  ".to_string());

        let backend = backend_from_config(&cfg, env);

        assert_eq!(backend.uri, DEFAULT_BACKEND_URI);
    }

    #[test]
    fn bad_bind_is_an_error() {
        let cfg = ServerConfig {
            bind: Some("not-an-address".to_string()),
            ..Default::default()
        };

        assert!(bind_from_config(&cfg).is_err());
    }
}
