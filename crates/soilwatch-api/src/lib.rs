// soilwatch-api: Async Rust client for the soil-watering relay

pub mod client;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod transport;

pub use client::RelayClient;
pub use error::Error;
pub use models::{ActuatorAck, ActuatorCommand, AnalyticsResponse, HistoricalDataPoint, StatsPayload};
pub use telemetry::{SseDecoder, SseEvent, TelemetryStream};
pub use transport::{TlsMode, TransportConfig};
