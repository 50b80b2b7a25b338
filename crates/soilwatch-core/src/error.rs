// ── Core error types ──
//
// User-facing errors from soilwatch-core. Consumers never see raw
// reqwest or serde failures; the `From<soilwatch_api::Error>` impl
// translates transport-layer errors into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach relay at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to relay timed out")]
    RequestTimeout,

    #[error("Timed out after {timeout_secs}s waiting for {what}")]
    WaitTimeout { what: String, timeout_secs: u64 },

    // ── Relay responses ──────────────────────────────────────────────
    /// Non-2xx answer from the relay.
    #[error("HTTP error! status: {status}")]
    Rejected { status: u16, body: String },

    #[error("Unexpected response from relay: {message}")]
    InvalidResponse { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Client has been torn down")]
    Disposed,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failure is likely to clear up on its own.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::RequestTimeout => true,
            Self::Rejected { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<soilwatch_api::Error> for CoreError {
    fn from(err: soilwatch_api::Error) -> Self {
        match err {
            soilwatch_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::RequestTimeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else if let Some(status) = e.status() {
                    CoreError::Rejected {
                        status: status.as_u16(),
                        body: String::new(),
                    }
                } else {
                    CoreError::ConnectionFailed {
                        url: e.url().map(ToString::to_string).unwrap_or_default(),
                        reason: e.to_string(),
                    }
                }
            }
            soilwatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid relay URL: {e}"),
            },
            soilwatch_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            soilwatch_api::Error::Status { status, body } => CoreError::Rejected { status, body },
            soilwatch_api::Error::Deserialization { message, body: _ } => {
                CoreError::InvalidResponse { message }
            }
            soilwatch_api::Error::StreamEnded => CoreError::ConnectionFailed {
                url: String::new(),
                reason: "telemetry stream ended".into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_maps_to_rejected() {
        let err = CoreError::from(soilwatch_api::Error::Status {
            status: 502,
            body: "bad gateway".into(),
        });
        assert!(matches!(err, CoreError::Rejected { status: 502, .. }));
        assert_eq!(err.to_string(), "HTTP error! status: 502");
        assert!(err.is_transient());
    }

    #[test]
    fn deserialization_maps_to_invalid_response() {
        let err = CoreError::from(soilwatch_api::Error::Deserialization {
            message: "expected value".into(),
            body: "<html>".into(),
        });
        assert!(matches!(err, CoreError::InvalidResponse { .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn stream_end_is_a_connection_failure() {
        let err = CoreError::from(soilwatch_api::Error::StreamEnded);
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }
}
