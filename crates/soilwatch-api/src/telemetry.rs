//! Telemetry event stream (`text/event-stream`).
//!
//! The relay pushes one `data:` event per device publish. This module
//! decodes the raw byte stream into event payloads; it does not interpret
//! them and it does not reconnect. Reconnection is owned by the caller
//! (see `soilwatch_core::stream`).
//!
//! # Example
//!
//! ```rust,ignore
//! use futures_util::StreamExt;
//! use soilwatch_api::RelayClient;
//!
//! let client = RelayClient::from_reqwest("http://localhost:4000", reqwest::Client::new())?;
//! let mut stream = client.open_telemetry().await?;
//!
//! while let Some(payload) = stream.next().await {
//!     println!("{}", payload?);
//! }
//! // `None` means the relay closed the stream.
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use futures_util::StreamExt;

use crate::error::Error;

/// Event type the relay uses for telemetry (the SSE default).
const MESSAGE_EVENT: &str = "message";

// ── SseEvent ─────────────────────────────────────────────────────────

/// A single dispatched server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type; `"message"` when the server sent no `event:` field.
    pub event: String,
    /// Concatenated `data:` lines, joined with `\n`.
    pub data: String,
    /// Last event id seen on the stream, if any.
    pub id: Option<String>,
}

impl SseEvent {
    /// Whether this is an unnamed (default) event.
    pub fn is_message(&self) -> bool {
        self.event == MESSAGE_EVENT
    }
}

// ── SseDecoder ───────────────────────────────────────────────────────

/// Incremental `text/event-stream` decoder.
///
/// Feed it arbitrary byte chunks; it returns every event completed by
/// that chunk. Lines end in `\n`, `\r\n`, or a bare `\r`, and may be split
/// across chunks at any byte, including inside a multi-byte UTF-8 sequence
/// or between the `\r` and `\n` of a pair.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    data: String,
    event: Option<String>,
    last_id: Option<String>,
    retry_ms: Option<u64>,
    after_cr: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay requested by the server via `retry:`, if any.
    pub fn retry_ms(&self) -> Option<u64> {
        self.retry_ms
    }

    /// Consume a chunk of bytes, returning the events it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        loop {
            // A `\r` ending the previous line may be the first half of `\r\n`.
            if self.after_cr {
                match self.pending.first() {
                    None => break,
                    Some(b'\n') => {
                        self.pending.remove(0);
                    }
                    Some(_) => {}
                }
                self.after_cr = false;
            }

            let Some(pos) = self.pending.iter().position(|&b| b == b'\n' || b == b'\r') else {
                break;
            };
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            let Some((&terminator, body)) = line.split_last() else {
                break;
            };
            self.after_cr = terminator == b'\r';

            let body = String::from_utf8_lossy(body);
            if let Some(event) = self.process_line(&body) {
                events.push(event);
            }
        }
        events
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event = Some(value.to_owned()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            "retry" => {
                if let Ok(ms) = value.parse() {
                    self.retry_ms = Some(ms);
                }
            }
            _ => tracing::trace!(field, "ignoring unknown SSE field"),
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }

        let mut data = std::mem::take(&mut self.data);
        data.pop();
        Some(SseEvent {
            event: event
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| MESSAGE_EVENT.to_owned()),
            data,
            id: self.last_id.clone(),
        })
    }
}

// ── TelemetryStream ──────────────────────────────────────────────────

type PayloadStream = Pin<Box<dyn Stream<Item = Result<String, Error>> + Send>>;

/// Stream of raw telemetry payloads (the `data` of each message event).
///
/// Ends (`None`) when the relay closes the connection. A transport error
/// is yielded once, after which the stream ends.
pub struct TelemetryStream {
    inner: PayloadStream,
}

impl TelemetryStream {
    pub(crate) fn from_response(resp: reqwest::Response) -> Self {
        let bytes = resp.bytes_stream();
        Self::from_byte_stream(bytes)
    }

    /// Build a payload stream over any byte-chunk stream.
    pub fn from_byte_stream<S, B>(bytes: S) -> Self
    where
        S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
    {
        let inner = async_stream::stream! {
            let mut bytes = std::pin::pin!(bytes);
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for event in decoder.feed(chunk.as_ref()) {
                            if event.is_message() {
                                yield Ok(event.data);
                            } else {
                                tracing::debug!(event = %event.event, "skipping named SSE event");
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(Error::Transport(e));
                        break;
                    }
                }
            }
        };

        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for TelemetryStream {
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for TelemetryStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryStream").finish_non_exhaustive()
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_data_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"temperature\":22.5}\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, r#"{"temperature":22.5}"#);
        assert!(events[0].is_message());
    }

    #[test]
    fn event_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: {\"humid").is_empty());
        assert!(decoder.feed(b"ity\":55.2}\r\n").is_empty());

        let events = decoder.feed(b"\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, r#"{"humidity":55.2}"#);
    }

    #[test]
    fn bare_carriage_return_ends_lines() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: one\r\rdata: two\r\r");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn crlf_split_across_chunks_is_one_line_ending() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: first\r").is_empty());
        // The `\n` completes the pair; it must not dispatch as a blank line.
        assert!(decoder.feed(b"\ndata: second\r").is_empty());

        let events = decoder.feed(b"\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn multi_byte_character_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let payload = "data: 22.5°C\n\n".as_bytes();
        let split = payload.iter().position(|&b| b == 0xC2).unwrap() + 1;

        assert!(decoder.feed(&payload[..split]).is_empty());
        let events = decoder.feed(&payload[split..]);
        assert_eq!(events[0].data, "22.5°C");
    }

    #[test]
    fn multiple_data_lines_join_with_newline() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: first\ndata: second\n\n");
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn comments_and_empty_events_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\n\n\ndata: x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn named_events_keep_their_type() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: ping\ndata: 1\n\ndata: 2\n\n");
        assert_eq!(events[0].event, "ping");
        assert!(!events[0].is_message());
        assert!(events[1].is_message());
    }

    #[test]
    fn id_and_retry_fields_are_tracked() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"id: 7\nretry: 5000\ndata: x\n\n");
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert_eq!(decoder.retry_ms(), Some(5000));
    }

    #[test]
    fn incomplete_event_is_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: partial\n").is_empty());
    }

    #[tokio::test]
    async fn payload_stream_filters_named_events_and_ends() {
        let chunks: Vec<Result<&'static [u8], reqwest::Error>> = vec![
            Ok(&b"data: a\n\nevent: status\ndata: b\n\n"[..]),
            Ok(&b"data: c\n\n"[..]),
        ];
        let mut stream = TelemetryStream::from_byte_stream(futures_util::stream::iter(chunks));

        assert_eq!(stream.next().await.unwrap().unwrap(), "a");
        assert_eq!(stream.next().await.unwrap().unwrap(), "c");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn partial_event_keeps_stream_pending() {
        let chunks = futures_util::stream::iter(vec![Ok::<_, reqwest::Error>(&b"data: par"[..])])
            .chain(futures_util::stream::pending());
        let mut stream = TelemetryStream::from_byte_stream(chunks);

        let mut next = tokio_test::task::spawn(stream.next());
        tokio_test::assert_pending!(next.poll());
    }
}
