// Wire types exchanged with the relay.
//
// Field names follow the relay's JSON exactly. Every analytics field is
// optional on the wire: the relay omits what it could not aggregate, and
// callers decide what an absent value means.

use serde::{Deserialize, Serialize};

/// Body of `POST /actuator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    pub water_pump: bool,
}

/// Acknowledgement returned by `POST /actuator` on success.
///
/// The relay currently answers `{"success":true,"message":"..."}`; both
/// fields are optional so a terser relay still parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActuatorAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /analytics`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsResponse {
    #[serde(default)]
    pub historical_data: Option<Vec<HistoricalDataPoint>>,
    #[serde(default)]
    pub stats: Option<StatsPayload>,
}

/// One aggregated sample of the historical series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDataPoint {
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub soil_moisture: Option<f64>,
}

/// Aggregated statistics block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsPayload {
    #[serde(default)]
    pub avg_temp: Option<f64>,
    #[serde(default)]
    pub avg_humidity: Option<f64>,
    #[serde(default)]
    pub avg_moisture: Option<f64>,
    #[serde(default)]
    pub pump_activations: Option<u64>,
}
