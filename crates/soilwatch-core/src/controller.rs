// ── Controller abstraction ──
//
// Session-level entry point. Wires one relay client into the stream
// client, the command publisher, and the analytics gateway, all of which
// write into a single StateStore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, watch};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info};

use soilwatch_api::RelayClient;

use crate::analytics::AnalyticsGateway;
use crate::command::CommandPublisher;
use crate::config::RelayConfig;
use crate::error::CoreError;
use crate::model::{AnalyticsSnapshot, ConnectionStatus, PublishOutcome, PumpCommand, SensorReading};
use crate::store::StateStore;
use crate::stream::{StreamClient, StreamHandle};

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the telemetry
/// stream lifecycle and routes pump commands and analytics fetches.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: RelayConfig,
    client: RelayClient,
    store: Arc<StateStore>,
    publisher: CommandPublisher,
    analytics: AnalyticsGateway,
    stream: Mutex<Option<StreamHandle>>,
}

impl Controller {
    /// Create a new Controller from configuration. Does NOT connect --
    /// call [`connect()`](Self::connect) to open the telemetry stream.
    pub fn new(config: RelayConfig) -> Result<Self, CoreError> {
        let client = RelayClient::new(config.url.clone(), &config.transport())?;
        let store = Arc::new(StateStore::new());

        Ok(Self {
            inner: Arc::new(ControllerInner {
                publisher: CommandPublisher::new(client.clone(), Arc::clone(&store)),
                analytics: AnalyticsGateway::new(client.clone(), Arc::clone(&store)),
                config,
                client,
                store,
                stream: Mutex::new(None),
            }),
        })
    }

    /// Access the relay configuration.
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Access the underlying StateStore.
    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Open (or reopen) the telemetry stream.
    ///
    /// Returns immediately: the store reports `connecting`, then
    /// `connected` once the relay accepts. Failures are retried forever
    /// at the configured fixed delay until [`teardown`](Self::teardown).
    pub async fn connect(&self) -> Result<(), CoreError> {
        if self.inner.store.is_disposed() {
            return Err(CoreError::Disposed);
        }

        let mut stream = self.inner.stream.lock().await;
        let handle = stream.get_or_insert_with(|| {
            debug!(url = %self.inner.config.url, "starting telemetry stream client");
            StreamClient::spawn(
                Arc::new(self.inner.client.clone()),
                Arc::clone(&self.inner.store),
                self.inner.config.reconnect_delay,
            )
        });
        handle.connect();
        Ok(())
    }

    /// Close the stream, cancel any pending reconnect, and freeze the
    /// store. Requests still in flight can no longer change state.
    pub async fn teardown(&self) {
        let handle = self.inner.stream.lock().await.take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }
        self.inner.store.dispose();
        info!("session torn down");
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Request the pump state opposite to the last reported one.
    pub async fn toggle_pump(&self) -> Result<PublishOutcome, CoreError> {
        let current = self.inner.store.reading();
        self.inner.publisher.toggle(&current).await
    }

    /// Request an explicit pump state.
    pub async fn set_pump(&self, on: bool) -> Result<PublishOutcome, CoreError> {
        self.inner
            .publisher
            .publish(PumpCommand { water_pump: on })
            .await
    }

    /// Fetch analytics into the store.
    pub async fn refresh_analytics(&self) -> Result<Arc<AnalyticsSnapshot>, CoreError> {
        self.inner.analytics.fetch().await
    }

    // ── Waiting ──────────────────────────────────────────────────

    /// Wait until the stream has delivered at least one valid reading.
    pub async fn wait_for_reading(&self, timeout: Duration) -> Result<SensorReading, CoreError> {
        let store = &self.inner.store;
        self.wait_until(timeout, "a sensor reading", |_| store.last_reading_at().is_some())
            .await
    }

    /// Wait until the device reports the pump in the given state.
    ///
    /// Only readings received from the stream count; the zeroed initial
    /// reading never satisfies this.
    pub async fn wait_for_pump(&self, on: bool, timeout: Duration) -> Result<SensorReading, CoreError> {
        let store = &self.inner.store;
        let what = if on { "pump to turn on" } else { "pump to turn off" };
        self.wait_until(timeout, what, |r| {
            r.water_pump == on && store.last_reading_at().is_some()
        })
        .await
    }

    async fn wait_until(
        &self,
        timeout: Duration,
        what: &str,
        mut pred: impl FnMut(&SensorReading) -> bool,
    ) -> Result<SensorReading, CoreError> {
        let mut rx = self.inner.store.subscribe_reading();
        let waited = tokio::time::timeout(timeout, async {
            rx.wait_for(|r| pred(r)).await.map(|r| *r)
        })
        .await;

        match waited {
            Ok(Ok(reading)) => Ok(reading),
            Ok(Err(_)) => Err(CoreError::Disposed),
            Err(_) => Err(CoreError::WaitTimeout {
                what: what.to_owned(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: build, run closure, tear down.
    ///
    /// The closure decides whether the stream is needed and calls
    /// [`connect()`](Self::connect) itself.
    pub async fn oneshot<F, Fut, T>(config: RelayConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config)?;
        let result = f(controller.clone()).await;
        controller.teardown().await;
        result
    }

    // ── State observation ────────────────────────────────────────

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.store.connection_status()
    }

    /// Subscribe to connection status changes.
    pub fn connection_state(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.store.subscribe_connection()
    }

    pub fn reading(&self) -> SensorReading {
        self.inner.store.reading()
    }

    pub fn readings(&self) -> WatchStream<SensorReading> {
        self.inner.store.reading_stream()
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("url", &self.inner.config.url.as_str())
            .field("store", &self.inner.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    const SSE_BODY: &str = concat!(
        "data: {\"temperature\":24.1,\"humidity\":48.0,\"soil_moisture\":2900,\"water_pump\":true}\n",
        "\n",
    );

    async fn setup() -> (MockServer, Controller) {
        let server = MockServer::start().await;
        let config = RelayConfig::new(server.uri().parse().unwrap());
        let controller = Controller::new(config).unwrap();
        (server, controller)
    }

    async fn mount_stream(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/data-streams"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(SSE_BODY),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn connect_delivers_first_reading() {
        let (server, controller) = setup().await;
        mount_stream(&server).await;

        controller.connect().await.unwrap();
        let reading = controller.wait_for_reading(Duration::from_secs(5)).await.unwrap();

        assert_eq!(
            reading,
            SensorReading {
                temperature: 24.1,
                humidity: 48.0,
                soil_moisture: 2900.0,
                water_pump: true,
            }
        );
        assert!(controller.store().has_connected());

        controller.teardown().await;
    }

    #[tokio::test]
    async fn toggle_uses_last_reported_state() {
        let (server, controller) = setup().await;
        mount_stream(&server).await;
        Mock::given(method("POST"))
            .and(path("/actuator"))
            .and(body_json(json!({ "water_pump": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        controller.connect().await.unwrap();
        controller
            .wait_for_pump(true, Duration::from_secs(5))
            .await
            .unwrap();

        let outcome = controller.toggle_pump().await.unwrap();
        assert!(matches!(outcome, PublishOutcome::Sent(_)));
        // Still on until the device says otherwise.
        assert!(controller.reading().water_pump);

        controller.teardown().await;
    }

    #[tokio::test]
    async fn wait_for_pump_times_out_without_stream() {
        let (_server, controller) = setup().await;

        let err = controller
            .wait_for_pump(false, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::WaitTimeout { .. }));
    }

    #[tokio::test]
    async fn connect_after_teardown_is_rejected() {
        let (_server, controller) = setup().await;
        controller.teardown().await;

        assert!(matches!(controller.connect().await, Err(CoreError::Disposed)));
        assert!(matches!(controller.toggle_pump().await, Err(CoreError::Disposed)));
    }

    #[tokio::test]
    async fn oneshot_runs_closure_then_disposes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/analytics"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "stats": { "pump_activations": 2 } })),
            )
            .mount(&server)
            .await;

        let config = RelayConfig::new(server.uri().parse().unwrap());
        let (snapshot, store) = Controller::oneshot(config, |c| async move {
            let snapshot = c.refresh_analytics().await?;
            Ok((snapshot, Arc::clone(c.store())))
        })
        .await
        .unwrap();

        assert_eq!(snapshot.stats.pump_activations, 2);
        assert!(store.is_disposed());
    }
}
