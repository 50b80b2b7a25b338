// ── Telemetry connection state machine ──
//
// Transport-free: every lifecycle event yields the effects to perform.
// The driver in `client.rs` feeds events in and carries effects out.
//
//   Connecting ──open──▶ Connected
//   Connecting/Connected ──error──▶ Disconnected ──delay──▶ Connecting
//
// Teardown leaves the machine for good; every later event is ignored.

use std::time::Duration;

use crate::model::{ConnectionStatus, SensorReading};
use crate::validate::{ValidationError, validate_frame};

/// Transient message shown while the stream is reconnecting.
pub const CONNECTION_LOST_MESSAGE: &str = "Connection lost. Reconnecting...";

/// Something that happened to the telemetry connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Caller asked for a (re)connection.
    Connect,
    /// The relay accepted the stream request.
    Opened,
    /// One raw event payload arrived.
    Frame(String),
    /// The connection failed or was closed by the relay.
    Failed(String),
    /// The reconnect delay elapsed.
    ReconnectElapsed,
    /// The client is going away.
    Teardown,
}

/// Side effect the driver must carry out, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEffect {
    CloseConnection,
    OpenConnection,
    SetStatus(ConnectionStatus),
    SetError(Option<String>),
    ApplyReading(SensorReading),
    DropFrame(ValidationError),
    ScheduleReconnect(Duration),
    CancelReconnect,
}

/// Connection lifecycle state.
#[derive(Debug)]
pub struct StreamMachine {
    status: ConnectionStatus,
    connection_live: bool,
    reconnect_pending: bool,
    disposed: bool,
    reconnect_delay: Duration,
}

impl StreamMachine {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            connection_live: false,
            reconnect_pending: false,
            disposed: false,
            reconnect_delay,
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    /// Apply one event, returning the effects to perform.
    pub fn handle(&mut self, event: StreamEvent) -> Vec<StreamEffect> {
        if self.disposed {
            return Vec::new();
        }

        match event {
            StreamEvent::Connect => self.connect(),
            StreamEvent::Opened => self.opened(),
            StreamEvent::Frame(raw) => self.frame(&raw),
            StreamEvent::Failed(_) => self.failed(),
            StreamEvent::ReconnectElapsed => {
                if !self.reconnect_pending {
                    return Vec::new();
                }
                self.reconnect_pending = false;
                self.connect()
            }
            StreamEvent::Teardown => self.teardown(),
        }
    }

    fn connect(&mut self) -> Vec<StreamEffect> {
        let mut effects = Vec::new();
        if self.connection_live {
            effects.push(StreamEffect::CloseConnection);
        }
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(StreamEffect::CancelReconnect);
        }

        self.connection_live = true;
        self.status = ConnectionStatus::Connecting;
        effects.push(StreamEffect::OpenConnection);
        effects.push(StreamEffect::SetStatus(ConnectionStatus::Connecting));
        effects
    }

    fn opened(&mut self) -> Vec<StreamEffect> {
        if !self.connection_live {
            return Vec::new();
        }
        self.status = ConnectionStatus::Connected;
        vec![
            StreamEffect::SetStatus(ConnectionStatus::Connected),
            StreamEffect::SetError(None),
        ]
    }

    fn frame(&mut self, raw: &str) -> Vec<StreamEffect> {
        if !self.connection_live {
            return Vec::new();
        }
        match validate_frame(raw) {
            Ok(reading) => vec![StreamEffect::ApplyReading(reading)],
            Err(e) => vec![StreamEffect::DropFrame(e)],
        }
    }

    fn failed(&mut self) -> Vec<StreamEffect> {
        if !self.connection_live {
            return Vec::new();
        }
        self.connection_live = false;
        self.status = ConnectionStatus::Disconnected;

        let mut effects = vec![
            StreamEffect::SetStatus(ConnectionStatus::Disconnected),
            StreamEffect::SetError(Some(CONNECTION_LOST_MESSAGE.to_owned())),
            StreamEffect::CloseConnection,
        ];
        if self.reconnect_pending {
            effects.push(StreamEffect::CancelReconnect);
        }
        self.reconnect_pending = true;
        effects.push(StreamEffect::ScheduleReconnect(self.reconnect_delay));
        effects
    }

    fn teardown(&mut self) -> Vec<StreamEffect> {
        let mut effects = Vec::new();
        if self.connection_live {
            effects.push(StreamEffect::CloseConnection);
        }
        if self.reconnect_pending {
            effects.push(StreamEffect::CancelReconnect);
        }
        self.connection_live = false;
        self.reconnect_pending = false;
        self.disposed = true;
        effects
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const DELAY: Duration = Duration::from_millis(3000);

    fn machine() -> StreamMachine {
        StreamMachine::new(DELAY)
    }

    const FRAME: &str =
        r#"{"temperature":22.5,"humidity":55.2,"soil_moisture":340,"water_pump":false}"#;

    #[test]
    fn first_connect_opens_without_closing() {
        let mut m = machine();
        assert_eq!(
            m.handle(StreamEvent::Connect),
            vec![
                StreamEffect::OpenConnection,
                StreamEffect::SetStatus(ConnectionStatus::Connecting),
            ]
        );
        assert_eq!(m.status(), ConnectionStatus::Connecting);
    }

    #[test]
    fn connect_closes_existing_connection_first() {
        for opened in [false, true] {
            let mut m = machine();
            m.handle(StreamEvent::Connect);
            if opened {
                m.handle(StreamEvent::Opened);
            }

            let effects = m.handle(StreamEvent::Connect);
            assert_eq!(effects[0], StreamEffect::CloseConnection);
            assert_eq!(effects[1], StreamEffect::OpenConnection);
        }
    }

    #[test]
    fn open_connects_and_clears_error() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        assert_eq!(
            m.handle(StreamEvent::Opened),
            vec![
                StreamEffect::SetStatus(ConnectionStatus::Connected),
                StreamEffect::SetError(None),
            ]
        );
    }

    #[test]
    fn valid_frame_is_applied_whole() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Opened);

        assert_eq!(
            m.handle(StreamEvent::Frame(FRAME.into())),
            vec![StreamEffect::ApplyReading(SensorReading {
                temperature: 22.5,
                humidity: 55.2,
                soil_moisture: 340.0,
                water_pump: false,
            })]
        );
    }

    #[test]
    fn invalid_frame_is_dropped_and_status_kept() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Opened);

        let effects = m.handle(StreamEvent::Frame(r#"{"temperature":22.5}"#.into()));
        assert_eq!(
            effects,
            vec![StreamEffect::DropFrame(ValidationError::MissingField("humidity"))]
        );
        assert_eq!(m.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn failure_disconnects_then_schedules_one_reconnect() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Opened);

        assert_eq!(
            m.handle(StreamEvent::Failed("reset".into())),
            vec![
                StreamEffect::SetStatus(ConnectionStatus::Disconnected),
                StreamEffect::SetError(Some(CONNECTION_LOST_MESSAGE.into())),
                StreamEffect::CloseConnection,
                StreamEffect::ScheduleReconnect(DELAY),
            ]
        );
        assert!(m.reconnect_pending());

        // A second error from the already-closed connection changes nothing.
        assert!(m.handle(StreamEvent::Failed("again".into())).is_empty());
    }

    #[test]
    fn failure_while_connecting_also_reconnects() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);

        let effects = m.handle(StreamEvent::Failed("refused".into()));
        assert!(effects.contains(&StreamEffect::ScheduleReconnect(DELAY)));
        assert_eq!(m.status(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn delay_is_fixed_across_attempts() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);

        for _ in 0..5 {
            let effects = m.handle(StreamEvent::Failed("refused".into()));
            assert_eq!(effects.last(), Some(&StreamEffect::ScheduleReconnect(DELAY)));
            let effects = m.handle(StreamEvent::ReconnectElapsed);
            assert_eq!(effects[0], StreamEffect::OpenConnection);
        }
    }

    #[test]
    fn manual_connect_supersedes_pending_reconnect() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Failed("refused".into()));

        let effects = m.handle(StreamEvent::Connect);
        assert_eq!(
            effects,
            vec![
                StreamEffect::CancelReconnect,
                StreamEffect::OpenConnection,
                StreamEffect::SetStatus(ConnectionStatus::Connecting),
            ]
        );
        // The superseded timer firing late must not open a second connection.
        assert!(m.handle(StreamEvent::ReconnectElapsed).is_empty());
    }

    #[test]
    fn frames_after_failure_are_ignored() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Failed("reset".into()));
        assert!(m.handle(StreamEvent::Frame(FRAME.into())).is_empty());
        assert!(m.handle(StreamEvent::Opened).is_empty());
    }

    #[test]
    fn teardown_cancels_pending_reconnect() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Failed("reset".into()));

        assert_eq!(m.handle(StreamEvent::Teardown), vec![StreamEffect::CancelReconnect]);
        assert!(m.is_disposed());
        assert!(m.handle(StreamEvent::ReconnectElapsed).is_empty());
        assert!(m.handle(StreamEvent::Connect).is_empty());
    }

    #[test]
    fn teardown_closes_live_connection() {
        let mut m = machine();
        m.handle(StreamEvent::Connect);
        m.handle(StreamEvent::Opened);

        assert_eq!(m.handle(StreamEvent::Teardown), vec![StreamEffect::CloseConnection]);
        assert!(m.handle(StreamEvent::Frame(FRAME.into())).is_empty());
    }
}
