// soilwatch-core: Reactive state layer between soilwatch-api and consumers (CLI).

pub mod analytics;
pub mod command;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use analytics::AnalyticsGateway;
pub use command::{CommandPublisher, PUBLISH_ERROR_PREFIX};
pub use config::{DEFAULT_RECONNECT_DELAY, DEFAULT_RELAY_URL, RelayConfig, TlsVerification};
pub use controller::Controller;
pub use error::CoreError;
pub use store::StateStore;
pub use stream::{CONNECTION_LOST_MESSAGE, StreamClient, StreamHandle, TelemetrySource};
pub use validate::{ValidationError, validate_frame, validate_payload};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AnalyticsSnapshot, CommandAck, ConnectionStatus, HistoricalPoint, PublishOutcome, PumpCommand,
    SensorReading, Stats,
};
