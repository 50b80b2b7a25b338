use thiserror::Error;

/// Top-level error type for the `soilwatch-api` crate.
///
/// Covers every failure mode of the relay's client-facing surfaces:
/// transport, HTTP status, response decoding, and the telemetry stream.
/// `soilwatch-core` maps these into domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Relay responses ─────────────────────────────────────────────
    /// The relay answered with a non-2xx status.
    #[error("HTTP error! status: {status}")]
    Status { status: u16, body: String },

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    // ── Telemetry stream ────────────────────────────────────────────
    /// The relay closed the event stream.
    #[error("Telemetry stream ended")]
    StreamEnded,
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            Self::StreamEnded => true,
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// HTTP status code of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_message_matches_relay_wording() {
        let err = Error::Status {
            status: 500,
            body: "Failed to send command to device".into(),
        };
        assert_eq!(err.to_string(), "HTTP error! status: 500");
        assert_eq!(err.status(), Some(500));
        assert!(err.is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        let err = Error::Status {
            status: 400,
            body: "Invalid JSON".into(),
        };
        assert!(!err.is_transient());
        assert!(!Error::Tls("bad cert".into()).is_transient());
        assert!(Error::StreamEnded.is_transient());
    }
}
