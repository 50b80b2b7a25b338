//! CLI-side config resolution: config file + env, then global flags.

use soilwatch_config::{Config, load_config};
use soilwatch_core::{RelayConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build the `RelayConfig` for this invocation.
///
/// Precedence, lowest to highest: built-in defaults, config file,
/// `SOILWATCH_RELAY__*` environment, command-line flags.
pub fn resolve_relay_config(global: &GlobalOpts) -> Result<RelayConfig, CliError> {
    let cfg = load_config()?;
    apply_overrides(&cfg, global)
}

fn apply_overrides(cfg: &Config, global: &GlobalOpts) -> Result<RelayConfig, CliError> {
    let mut relay = cfg.relay.clone();
    if let Some(ref url) = global.relay {
        relay.url.clone_from(url);
    }
    if let Some(timeout) = global.timeout {
        relay.timeout = timeout;
    }

    let mut config = relay.to_relay_config()?;
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    tracing::debug!(
        url = %config.url,
        timeout_secs = config.timeout.as_secs(),
        reconnect_delay_ms = u64::try_from(config.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
        "resolved relay config"
    );
    Ok(config)
}
