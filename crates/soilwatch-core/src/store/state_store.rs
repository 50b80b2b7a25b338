// ── Central reactive state store ──
//
// Holds the current reading, connection status, analytics, and the
// transient indicators presentation renders. Each value lives in its own
// `watch` channel so consumers can subscribe to exactly what they show.
// Writes are crate-private: only the stream client, the command
// publisher, and the analytics gateway mutate the store.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::{AnalyticsSnapshot, ConnectionStatus, SensorReading};

/// Central state holder for one client session.
///
/// Once [`dispose`](Self::dispose)d, every mutation is silently ignored:
/// requests that resolve after teardown cannot write into it.
pub struct StateStore {
    reading: watch::Sender<SensorReading>,
    last_reading_at: watch::Sender<Option<DateTime<Utc>>>,
    connection: watch::Sender<ConnectionStatus>,
    connection_error: watch::Sender<Option<String>>,
    has_connected: watch::Sender<bool>,
    publishing: watch::Sender<bool>,
    publish_error: watch::Sender<Option<String>>,
    analytics: watch::Sender<Option<Arc<AnalyticsSnapshot>>>,
    disposed: AtomicBool,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            reading: watch::Sender::new(SensorReading::default()),
            last_reading_at: watch::Sender::new(None),
            connection: watch::Sender::new(ConnectionStatus::default()),
            connection_error: watch::Sender::new(None),
            has_connected: watch::Sender::new(false),
            publishing: watch::Sender::new(false),
            publish_error: watch::Sender::new(None),
            analytics: watch::Sender::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    pub fn reading(&self) -> SensorReading {
        *self.reading.borrow()
    }

    /// When the current reading arrived, or `None` if no frame has been
    /// accepted yet (the reading is still the zeroed default).
    pub fn last_reading_at(&self) -> Option<DateTime<Utc>> {
        *self.last_reading_at.borrow()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        *self.connection.borrow()
    }

    /// Transient "connection lost" message, set while reconnecting.
    pub fn connection_error(&self) -> Option<String> {
        self.connection_error.borrow().clone()
    }

    /// Whether the stream has opened at least once this session.
    pub fn has_connected(&self) -> bool {
        *self.has_connected.borrow()
    }

    /// Whether a command is awaiting its response.
    pub fn is_publishing(&self) -> bool {
        *self.publishing.borrow()
    }

    /// Message from the last failed command, cleared by the next attempt.
    pub fn publish_error(&self) -> Option<String> {
        self.publish_error.borrow().clone()
    }

    pub fn analytics(&self) -> Option<Arc<AnalyticsSnapshot>> {
        self.analytics.borrow().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe_reading(&self) -> watch::Receiver<SensorReading> {
        self.reading.subscribe()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionStatus> {
        self.connection.subscribe()
    }

    pub fn subscribe_connection_error(&self) -> watch::Receiver<Option<String>> {
        self.connection_error.subscribe()
    }

    pub fn subscribe_publishing(&self) -> watch::Receiver<bool> {
        self.publishing.subscribe()
    }

    pub fn subscribe_analytics(&self) -> watch::Receiver<Option<Arc<AnalyticsSnapshot>>> {
        self.analytics.subscribe()
    }

    /// Readings as a `Stream`, starting with the current value.
    pub fn reading_stream(&self) -> WatchStream<SensorReading> {
        WatchStream::new(self.reading.subscribe())
    }

    /// Connection status as a `Stream`, starting with the current value.
    pub fn connection_stream(&self) -> WatchStream<ConnectionStatus> {
        WatchStream::new(self.connection.subscribe())
    }

    // ── Mutations (crate-private) ────────────────────────────────────

    /// Replace the whole reading with one accepted from the stream.
    pub(crate) fn apply_reading(&self, reading: SensorReading) {
        if self.is_disposed() {
            return;
        }
        self.last_reading_at.send_replace(Some(Utc::now()));
        self.reading.send_replace(reading);
    }

    pub(crate) fn set_connection_status(&self, status: ConnectionStatus) {
        if self.is_disposed() {
            return;
        }
        if status == ConnectionStatus::Connected {
            self.has_connected.send_if_modified(|seen| !std::mem::replace(seen, true));
        }
        self.connection.send_if_modified(|current| {
            let changed = *current != status;
            *current = status;
            changed
        });
    }

    pub(crate) fn set_connection_error(&self, message: Option<String>) {
        if self.is_disposed() {
            return;
        }
        self.connection_error.send_replace(message);
    }

    /// Claim the in-flight flag. Returns `false` if it was already set (or
    /// the store is disposed), in which case nothing changes.
    pub(crate) fn try_begin_publish(&self) -> bool {
        if self.is_disposed() {
            return false;
        }
        self.publishing.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        })
    }

    pub(crate) fn end_publish(&self) {
        if self.is_disposed() {
            return;
        }
        self.publishing.send_replace(false);
    }

    pub(crate) fn set_publish_error(&self, message: Option<String>) {
        if self.is_disposed() {
            return;
        }
        self.publish_error.send_replace(message);
    }

    /// Replace the previous analytics snapshot wholesale.
    pub(crate) fn replace_analytics(&self, snapshot: Arc<AnalyticsSnapshot>) {
        if self.is_disposed() {
            return;
        }
        self.analytics.send_replace(Some(snapshot));
    }

    /// Freeze the store. Subsequent mutations are no-ops.
    pub(crate) fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("reading", &self.reading())
            .field("connection", &self.connection_status())
            .field("publishing", &self.is_publishing())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}
