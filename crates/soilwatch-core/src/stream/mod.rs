// ── Telemetry stream ──
//
// `machine` decides, `client` performs.

mod client;
mod machine;

pub use client::{FrameStream, StreamClient, StreamHandle, TelemetrySource};
pub use machine::{CONNECTION_LOST_MESSAGE, StreamEffect, StreamEvent, StreamMachine};
