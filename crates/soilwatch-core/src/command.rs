// ── Pump command publisher ──
//
// One command in flight at a time. A successful publish changes nothing
// in the reading: the pump state only moves when the device reports it
// back through the telemetry stream.

use std::sync::Arc;

use tracing::{debug, info, warn};

use soilwatch_api::{ActuatorCommand, RelayClient};

use crate::error::CoreError;
use crate::model::{CommandAck, PublishOutcome, PumpCommand, SensorReading};
use crate::store::StateStore;

/// Prefix for the user-visible message of a failed publish.
pub const PUBLISH_ERROR_PREFIX: &str = "Failed to send command";

/// Sends pump commands to the relay.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    client: RelayClient,
    store: Arc<StateStore>,
}

/// Holds the store's in-flight flag; clears it on drop, whatever the
/// outcome of the request (or if the future is dropped mid-request).
struct PublishGuard<'a> {
    store: &'a StateStore,
}

impl<'a> PublishGuard<'a> {
    fn acquire(store: &'a StateStore) -> Option<Self> {
        store.try_begin_publish().then_some(Self { store })
    }
}

impl Drop for PublishGuard<'_> {
    fn drop(&mut self) {
        self.store.end_publish();
    }
}

impl CommandPublisher {
    pub fn new(client: RelayClient, store: Arc<StateStore>) -> Self {
        Self { client, store }
    }

    /// Publish `command`, unless another command is still in flight.
    ///
    /// Returns [`PublishOutcome::InFlight`] without any network activity
    /// when the flag is already held, and [`CoreError::Disposed`] after
    /// teardown. On failure the store's publish
    /// error is set and the error is returned.
    pub async fn publish(&self, command: PumpCommand) -> Result<PublishOutcome, CoreError> {
        if self.store.is_disposed() {
            return Err(CoreError::Disposed);
        }
        let Some(_guard) = PublishGuard::acquire(&self.store) else {
            debug!(?command, "command already in flight, ignoring");
            return Ok(PublishOutcome::InFlight);
        };

        self.store.set_publish_error(None);

        let body = ActuatorCommand {
            water_pump: command.water_pump,
        };
        match self.client.publish_actuator(&body).await {
            Ok(ack) => {
                info!(water_pump = command.water_pump, "pump command accepted by relay");
                Ok(PublishOutcome::Sent(CommandAck {
                    command,
                    message: ack.message,
                }))
            }
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, water_pump = command.water_pump, "pump command failed");
                self.store
                    .set_publish_error(Some(format!("{PUBLISH_ERROR_PREFIX}: {err}")));
                Err(err)
            }
        }
    }

    /// Ask for the pump state opposite to `current`.
    pub async fn toggle(&self, current: &SensorReading) -> Result<PublishOutcome, CoreError> {
        self.publish(PumpCommand::toggle_of(current)).await
    }
}
