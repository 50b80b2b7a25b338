// ── Runtime relay configuration ──
//
// These types describe *how* to reach the relay. They never touch disk:
// the binary (via soilwatch-config) constructs a `RelayConfig` and
// hands it in.

use std::str::FromStr;
use std::time::Duration;

use url::Url;

use soilwatch_api::{TlsMode, TransportConfig};

/// Relay origin used when nothing else is configured.
pub const DEFAULT_RELAY_URL: &str = "http://localhost:4000";

/// Fixed delay between a stream failure and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for talking to a single relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Relay origin (e.g., `http://localhost:4000`).
    pub url: Url,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Timeout for one-shot requests (actuator, analytics).
    pub timeout: Duration,
    /// Delay before reconnecting after a stream failure. Fixed: it does
    /// not grow between attempts and attempts are never capped.
    pub reconnect_delay: Duration,
}

impl RelayConfig {
    /// Config for the given origin with all other settings defaulted.
    pub fn new(url: Url) -> Self {
        Self {
            url,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        let tls = match &self.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        };

        TransportConfig {
            tls,
            timeout: self.timeout,
            ..TransportConfig::default()
        }
    }
}

impl FromStr for RelayConfig {
    type Err = url::ParseError;

    /// Parse a relay origin, defaulting every other setting.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s).map(Self::new)
    }
}
