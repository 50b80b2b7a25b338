// Integration tests for `RelayClient` using wiremock.
#![allow(clippy::unwrap_used)]

use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use soilwatch_api::{ActuatorCommand, Error, RelayClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, RelayClient) {
    let server = MockServer::start().await;
    let client = RelayClient::from_reqwest(&server.uri(), reqwest::Client::new()).unwrap();
    (server, client)
}

// ── Actuator ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_publish_actuator_sends_command_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/actuator"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "water_pump": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Command sent successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ack = client
        .publish_actuator(&ActuatorCommand { water_pump: true })
        .await
        .unwrap();

    assert_eq!(ack.success, Some(true));
    assert_eq!(ack.message.as_deref(), Some("Command sent successfully"));
}

#[tokio::test]
async fn test_publish_actuator_non_json_ack_is_not_an_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/actuator"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let ack = client
        .publish_actuator(&ActuatorCommand { water_pump: false })
        .await
        .unwrap();

    assert_eq!(ack.success, None);
}

#[tokio::test]
async fn test_publish_actuator_server_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/actuator"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Failed to send command to device"))
        .mount(&server)
        .await;

    let err = client
        .publish_actuator(&ActuatorCommand { water_pump: true })
        .await
        .unwrap_err();

    match err {
        Error::Status { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "Failed to send command to device");
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

// ── Analytics ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_analytics_full_body() {
    let (server, client) = setup().await;

    let body = json!({
        "historical_data": [
            { "time": "2025-01-01T10:00:00Z", "temperature": 21.0, "humidity": 50.0, "soil_moisture": 2900.0 },
            { "time": "2025-01-01T10:01:00Z", "temperature": 21.5, "humidity": 51.0, "soil_moisture": 2850.0 }
        ],
        "stats": {
            "avg_temp": 21.25,
            "avg_humidity": 50.5,
            "avg_moisture": 2875.0,
            "pump_activations": 3
        }
    });

    Mock::given(method("GET"))
        .and(path("/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let resp = client.fetch_analytics().await.unwrap();
    let series = resp.historical_data.unwrap();
    let stats = resp.stats.unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(series[0].time.as_deref(), Some("2025-01-01T10:00:00Z"));
    assert_eq!(series[1].soil_moisture, Some(2850.0));
    assert_eq!(stats.avg_temp, Some(21.25));
    assert_eq!(stats.pump_activations, Some(3));
}

#[tokio::test]
async fn test_fetch_analytics_empty_object() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let resp = client.fetch_analytics().await.unwrap();
    assert!(resp.stats.is_none());
    assert!(resp.historical_data.is_none());
}

#[tokio::test]
async fn test_fetch_analytics_invalid_json() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/analytics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client.fetch_analytics().await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body.contains("oops")));
}

#[tokio::test]
async fn test_fetch_analytics_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/analytics"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.fetch_analytics().await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!err.is_transient());
}

// ── Telemetry stream ────────────────────────────────────────────────

#[tokio::test]
async fn test_open_telemetry_yields_payloads_then_ends() {
    let (server, client) = setup().await;

    let body = concat!(
        "data: {\"temperature\":22.5,\"humidity\":55.2,\"soil_moisture\":340,\"water_pump\":false}\n\n",
        ": keep-alive\n\n",
        "data: {\"temperature\":22.6,\"humidity\":55.0,\"soil_moisture\":338,\"water_pump\":true}\n\n",
    );

    Mock::given(method("GET"))
        .and(path("/data-streams"))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(body),
        )
        .mount(&server)
        .await;

    let mut stream = client.open_telemetry().await.unwrap();

    let first = stream.next().await.unwrap().unwrap();
    let second = stream.next().await.unwrap().unwrap();
    assert!(first.contains("\"water_pump\":false"));
    assert!(second.contains("\"water_pump\":true"));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn test_open_telemetry_rejected_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/data-streams"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client.open_telemetry().await.unwrap_err();
    assert_eq!(err.status(), Some(503));
    assert!(err.is_transient());
}
