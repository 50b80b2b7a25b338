// ── Domain model ──
//
// View-facing types. Wire shapes live in `soilwatch_api::models`;
// `convert.rs` maps between the two.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Last-known device state, as received from the telemetry stream.
///
/// `water_pump` is only ever set from a stream frame, never from a
/// command the client has sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    /// Raw device value; lower means wetter soil.
    pub soil_moisture: f64,
    pub water_pump: bool,
}

/// State of the telemetry connection.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    #[default]
    Disconnected,
}

/// A pump control request. Not state: it only lives for one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumpCommand {
    pub water_pump: bool,
}

impl PumpCommand {
    /// The command that inverts the pump state of `current`.
    pub fn toggle_of(current: &SensorReading) -> Self {
        Self {
            water_pump: !current.water_pump,
        }
    }
}

/// Aggregated statistics over the relay's analytics window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub avg_temp: f64,
    pub avg_humidity: f64,
    pub avg_moisture: f64,
    pub pump_activations: u64,
}

/// One sample of the historical series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub time: String,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
}

/// Result of one successful analytics fetch. Replaced wholesale on the
/// next successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub stats: Stats,
    /// Oldest first, in the order the relay sent them.
    pub series: Vec<HistoricalPoint>,
    pub fetched_at: DateTime<Utc>,
}

/// Acknowledgement of a command the relay accepted.
///
/// Accepted by the relay, not applied by the device: pump state only
/// changes once the device publishes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandAck {
    pub command: PumpCommand,
    pub message: Option<String>,
}

/// Outcome of a publish attempt that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The relay accepted the command.
    Sent(CommandAck),
    /// Another command is still awaiting its response; nothing was sent.
    InFlight,
}
