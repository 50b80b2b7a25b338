// Relay HTTP client
//
// Wraps `reqwest::Client` with relay-specific URL construction and
// status handling. The relay exposes three client-facing endpoints:
// the telemetry event stream, the actuator command endpoint, and the
// analytics aggregation endpoint.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{ActuatorAck, ActuatorCommand, AnalyticsResponse};
use crate::telemetry::TelemetryStream;
use crate::transport::TransportConfig;

const DATA_STREAMS_PATH: &str = "data-streams";
const ACTUATOR_PATH: &str = "actuator";
const ANALYTICS_PATH: &str = "analytics";

/// Raw HTTP client for the relay.
///
/// Holds two `reqwest::Client`s: one with a request timeout for one-shot
/// calls, and one without for the event stream.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: Url,
}

impl RelayClient {
    /// Create a new relay client from a `TransportConfig`.
    ///
    /// `base_url` is the relay origin, e.g. `http://localhost:4000`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            stream_http: transport.build_stream_client()?,
            base_url,
        })
    }

    /// Create a relay client from a base URL string and a pre-built client.
    ///
    /// The same client serves both one-shot requests and the stream.
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        Ok(Self {
            stream_http: http.clone(),
            http,
            base_url: Url::parse(base_url)?,
        })
    }

    /// The relay base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for a relay endpoint: `{base}/{path}`.
    ///
    /// Any path already present on the base URL is kept as a prefix, so a
    /// relay mounted under `/soil/` still resolves correctly.
    pub(crate) fn endpoint_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Open the telemetry event stream (`GET /data-streams`).
    ///
    /// Resolves once the relay has answered with a 2xx status; the
    /// returned stream then yields one JSON payload per event.
    pub async fn open_telemetry(&self) -> Result<TelemetryStream, Error> {
        let url = self.endpoint_url(DATA_STREAMS_PATH)?;
        debug!("GET {} (event stream)", url);

        let resp = self
            .stream_http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(Error::Transport)?;

        let resp = ensure_success(resp).await?;
        Ok(TelemetryStream::from_response(resp))
    }

    /// Send a pump command (`POST /actuator`).
    ///
    /// Any non-2xx status is an error. The acknowledgement body is parsed
    /// leniently: an empty or unexpected body yields a default ack.
    pub async fn publish_actuator(&self, command: &ActuatorCommand) -> Result<ActuatorAck, Error> {
        let url = self.endpoint_url(ACTUATOR_PATH)?;
        let resp = self.post(url, command).await?;
        let body = resp.text().await.map_err(Error::Transport)?;

        match serde_json::from_str::<ActuatorAck>(&body) {
            Ok(ack) => Ok(ack),
            Err(e) => {
                debug!(error = %e, "actuator acknowledgement was not JSON");
                Ok(ActuatorAck::default())
            }
        }
    }

    /// Fetch aggregated statistics and the historical series (`GET /analytics`).
    pub async fn fetch_analytics(&self) -> Result<AnalyticsResponse, Error> {
        let url = self.endpoint_url(ANALYTICS_PATH)?;
        self.get_json(url).await
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        let resp = ensure_success(resp).await?;
        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn post(&self, url: Url, body: &impl Serialize) -> Result<reqwest::Response, Error> {
        debug!("POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Error::Transport)?;

        ensure_success(resp).await
    }
}

/// Turn a non-2xx response into [`Error::Status`], keeping the body text.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        body,
    })
}
