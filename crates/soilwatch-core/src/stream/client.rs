// ── Telemetry stream driver ──
//
// Runs the `StreamMachine` on a single task. Connections and the
// reconnect timer live on helper tasks that only ever report back through
// the driver's channel, so every event is handled to completion, in
// arrival order, before the next one.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use soilwatch_api::RelayClient;

use super::machine::{StreamEffect, StreamEvent, StreamMachine};
use crate::store::StateStore;

/// Raw payload stream produced by a [`TelemetrySource`].
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, soilwatch_api::Error>> + Send>>;

/// Anything that can open a telemetry connection.
///
/// Implemented for [`RelayClient`]; tests substitute a scripted source.
pub trait TelemetrySource: Send + Sync + 'static {
    /// Open one connection. Resolving `Ok` means the stream is open.
    fn open(&self) -> impl Future<Output = Result<FrameStream, soilwatch_api::Error>> + Send;
}

impl TelemetrySource for RelayClient {
    async fn open(&self) -> Result<FrameStream, soilwatch_api::Error> {
        let stream = self.open_telemetry().await?;
        Ok(Box::pin(stream))
    }
}

// ── Driver plumbing ──────────────────────────────────────────────────

/// Who sent an event. Events from a closed connection or a cancelled
/// timer carry a stale tag and are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Caller,
    Connection(u64),
    Timer(u64),
}

#[derive(Debug)]
struct Envelope {
    origin: Origin,
    event: StreamEvent,
}

struct Worker {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl Worker {
    fn stop(self) {
        self.token.cancel();
        self.handle.abort();
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running stream client.
///
/// Dropping the handle tears the client down.
#[derive(Debug)]
pub struct StreamHandle {
    tx: mpsc::UnboundedSender<Envelope>,
    task: Option<JoinHandle<()>>,
}

impl StreamHandle {
    /// (Re)connect. Any existing connection is closed first.
    pub fn connect(&self) {
        self.send(StreamEvent::Connect);
    }

    /// Close the connection and cancel any pending reconnect, then stop.
    pub fn teardown(&self) {
        self.send(StreamEvent::Teardown);
    }

    /// Tear down and wait for the driver task to finish.
    pub async fn shutdown(mut self) {
        self.teardown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    fn send(&self, event: StreamEvent) {
        let envelope = Envelope {
            origin: Origin::Caller,
            event,
        };
        // The driver has already exited after a teardown.
        let _ = self.tx.send(envelope);
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.teardown();
        }
    }
}

// ── StreamClient ─────────────────────────────────────────────────────

/// Owns at most one telemetry connection and keeps the store current.
pub struct StreamClient<S: TelemetrySource> {
    source: Arc<S>,
    store: Arc<StateStore>,
    machine: StreamMachine,
    tx: mpsc::UnboundedSender<Envelope>,
    connection: Option<Worker>,
    reconnect: Option<Worker>,
    generation: u64,
    timer_id: u64,
}

impl<S: TelemetrySource> StreamClient<S> {
    /// Spawn the driver task. Call [`StreamHandle::connect`] to start.
    pub fn spawn(source: Arc<S>, store: Arc<StateStore>, reconnect_delay: Duration) -> StreamHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        let client = Self {
            source,
            store,
            machine: StreamMachine::new(reconnect_delay),
            tx: tx.clone(),
            connection: None,
            reconnect: None,
            generation: 0,
            timer_id: 0,
        };

        let task = tokio::spawn(client.run(rx));
        StreamHandle {
            tx,
            task: Some(task),
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(Envelope { origin, event }) = rx.recv().await {
            if !self.is_current(origin) {
                debug!(?origin, "discarding event from a closed connection or cancelled timer");
                continue;
            }

            if let StreamEvent::Failed(ref reason) = event {
                warn!(error = %reason, "telemetry stream error");
            }

            for effect in self.machine.handle(event) {
                self.apply(effect);
            }

            if self.machine.is_disposed() {
                break;
            }
        }

        debug!("telemetry stream client exiting");
    }

    fn is_current(&self, origin: Origin) -> bool {
        match origin {
            Origin::Caller => true,
            Origin::Connection(generation) => {
                generation == self.generation && self.connection.is_some()
            }
            Origin::Timer(id) => id == self.timer_id && self.reconnect.is_some(),
        }
    }

    fn apply(&mut self, effect: StreamEffect) {
        match effect {
            StreamEffect::CloseConnection => {
                if let Some(worker) = self.connection.take() {
                    debug!(generation = self.generation, "closing telemetry connection");
                    worker.stop();
                }
            }
            StreamEffect::OpenConnection => self.open_connection(),
            StreamEffect::SetStatus(status) => {
                info!(%status, "telemetry connection status");
                self.store.set_connection_status(status);
            }
            StreamEffect::SetError(message) => self.store.set_connection_error(message),
            StreamEffect::ApplyReading(reading) => {
                debug!(?reading, "reading applied");
                self.store.apply_reading(reading);
            }
            StreamEffect::DropFrame(reason) => {
                warn!(%reason, "dropping malformed telemetry frame");
            }
            StreamEffect::ScheduleReconnect(delay) => self.schedule_reconnect(delay),
            StreamEffect::CancelReconnect => {
                if let Some(worker) = self.reconnect.take() {
                    debug!("cancelling pending reconnect");
                    worker.stop();
                }
            }
        }
    }

    fn open_connection(&mut self) {
        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();

        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = task_token.cancelled() => {}
                () = connection_task(source, generation, tx) => {}
            }
        });

        debug!(generation, "opening telemetry connection");
        self.connection = Some(Worker { token, handle });
    }

    fn schedule_reconnect(&mut self, delay: Duration) {
        self.timer_id += 1;
        let id = self.timer_id;
        let token = CancellationToken::new();

        let tx = self.tx.clone();
        let task_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = task_token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = tx.send(Envelope {
                        origin: Origin::Timer(id),
                        event: StreamEvent::ReconnectElapsed,
                    });
                }
            }
        });

        info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Waiting before reconnect"
        );
        self.reconnect = Some(Worker { token, handle });
    }
}

/// Single connection lifecycle: open, forward frames, report the failure.
async fn connection_task<S: TelemetrySource>(
    source: Arc<S>,
    generation: u64,
    tx: mpsc::UnboundedSender<Envelope>,
) {
    let report = |event: StreamEvent| {
        let _ = tx.send(Envelope {
            origin: Origin::Connection(generation),
            event,
        });
    };

    let mut frames = match source.open().await {
        Ok(frames) => frames,
        Err(e) => {
            report(StreamEvent::Failed(e.to_string()));
            return;
        }
    };
    report(StreamEvent::Opened);

    loop {
        match frames.next().await {
            Some(Ok(payload)) => report(StreamEvent::Frame(payload)),
            Some(Err(e)) => {
                report(StreamEvent::Failed(e.to_string()));
                return;
            }
            None => {
                report(StreamEvent::Failed(soilwatch_api::Error::StreamEnded.to_string()));
                return;
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
