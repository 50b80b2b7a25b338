//! Shared configuration for SoilWatch tools.
//!
//! TOML config file, `SOILWATCH_*` environment overrides, and translation
//! to `soilwatch_core::RelayConfig`. The CLI layers its flags on top.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use soilwatch_core::{DEFAULT_RELAY_URL, RelayConfig, TlsVerification};

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "SOILWATCH_CONFIG";

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `SOILWATCH_RELAY__RECONNECT_DELAY_MS=5000`.
pub const ENV_PREFIX: &str = "SOILWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Presentation defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// How to reach the relay.
    #[serde(default)]
    pub relay: RelaySection,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// The `[relay]` table.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RelaySection {
    /// Relay origin (e.g., "http://localhost:4000").
    #[serde(default = "default_url")]
    pub url: String,

    /// One-shot request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Fixed delay between a stream failure and the next attempt.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Accept self-signed TLS certificates.
    #[serde(default)]
    pub insecure: bool,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout: default_timeout(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            insecure: false,
            ca_cert: None,
        }
    }
}

fn default_url() -> String {
    DEFAULT_RELAY_URL.into()
}
fn default_timeout() -> u64 {
    30
}
fn default_reconnect_delay_ms() -> u64 {
    3000
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path: `SOILWATCH_CONFIG` if set, otherwise
/// XDG / platform conventions.
pub fn config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        return PathBuf::from(path);
    }

    ProjectDirs::from("com", "soilwatch", "soilwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("soilwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file path + environment. A missing file is not
/// an error: defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(&path, cfg)?;
    Ok(path)
}

pub fn save_config_to(path: &Path, cfg: &Config) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Translation ─────────────────────────────────────────────────────

impl RelaySection {
    /// Validate and build the runtime `RelayConfig`.
    pub fn to_relay_config(&self) -> Result<RelayConfig, ConfigError> {
        let url: url::Url = self.url.parse().map_err(|e| ConfigError::Validation {
            field: "relay.url".into(),
            reason: format!("invalid URL '{}': {e}", self.url),
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "relay.url".into(),
                reason: format!("expected an http or https URL, got '{}'", url.scheme()),
            });
        }

        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "relay.timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }

        if self.reconnect_delay_ms == 0 {
            return Err(ConfigError::Validation {
                field: "relay.reconnect_delay_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }

        let tls = if self.insecure {
            TlsVerification::DangerAcceptInvalid
        } else if let Some(ref ca_path) = self.ca_cert {
            TlsVerification::CustomCa(ca_path.clone())
        } else {
            TlsVerification::SystemDefaults
        };

        Ok(RelayConfig {
            url,
            tls,
            timeout: Duration::from_secs(self.timeout),
            reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
        })
    }
}
