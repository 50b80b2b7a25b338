//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use soilwatch_config::ConfigError;
use soilwatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to relay at {url}: {reason}")]
    #[diagnostic(
        code(soilwatch::connection_failed),
        help(
            "Check that the relay is running and reachable.\n\
             Set the URL with --relay, SOILWATCH_RELAY_URL, or `soilwatch config init --url <URL>`."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Relay responses ──────────────────────────────────────────────
    #[error("Relay rejected the request: HTTP error! status: {status}")]
    #[diagnostic(code(soilwatch::rejected), help("{hint}"))]
    Rejected { status: u16, hint: String },

    #[error("Unexpected response from relay: {message}")]
    #[diagnostic(code(soilwatch::invalid_response))]
    InvalidResponse { message: String },

    #[error("Another pump command is still in flight")]
    #[diagnostic(code(soilwatch::in_flight))]
    InFlight,

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request to relay timed out")]
    #[diagnostic(
        code(soilwatch::request_timeout),
        help("Increase the timeout with --timeout or check relay responsiveness.")
    )]
    RequestTimeout,

    #[error("Timed out after {seconds}s waiting for {what}")]
    #[diagnostic(
        code(soilwatch::timeout),
        help("Is the device online? Increase the wait with --wait-timeout or --timeout.")
    )]
    Timeout { what: String, seconds: u64 },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(soilwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    #[diagnostic(
        code(soilwatch::config),
        help("Inspect the effective settings with: soilwatch config show")
    )]
    Config { message: String },

    #[error("Config file already exists at {path}")]
    #[diagnostic(code(soilwatch::config_exists), help("Pass --force to overwrite it."))]
    ConfigExists { path: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(soilwatch::render))]
    Render(String),

    #[error("{0}")]
    #[diagnostic(code(soilwatch::internal))]
    Internal(String),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } | Self::RequestTimeout => exit_code::TIMEOUT,
            Self::Rejected { .. } | Self::InFlight => exit_code::REJECTED,
            Self::Validation { .. } | Self::Config { .. } | Self::ConfigExists { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::RequestTimeout => CliError::RequestTimeout,

            CoreError::WaitTimeout { what, timeout_secs } => CliError::Timeout {
                what,
                seconds: timeout_secs,
            },

            CoreError::Rejected { status, body } => {
                let mut hint = if status >= 500 {
                    String::from("The relay could not forward the request; check its broker connection.")
                } else {
                    String::from("Check the relay URL; it may not be a SoilWatch relay.")
                };
                let body = body.trim();
                if !body.is_empty() {
                    hint.push_str("\nRelay said: ");
                    hint.push_str(body);
                }
                CliError::Rejected { status, hint }
            }

            CoreError::InvalidResponse { message } => CliError::InvalidResponse { message },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Disposed => CliError::Internal("client was torn down mid-request".into()),

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}
