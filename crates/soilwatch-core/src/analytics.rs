// ── Analytics gateway ──
//
// One-shot fetch of aggregated statistics and the historical series.
// A failed fetch keeps whatever snapshot the store already holds.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use soilwatch_api::RelayClient;

use crate::error::CoreError;
use crate::model::AnalyticsSnapshot;
use crate::store::StateStore;

#[derive(Debug, Clone)]
pub struct AnalyticsGateway {
    client: RelayClient,
    store: Arc<StateStore>,
}

impl AnalyticsGateway {
    pub fn new(client: RelayClient, store: Arc<StateStore>) -> Self {
        Self { client, store }
    }

    /// Fetch analytics and replace the store's snapshot.
    ///
    /// No retry. On error the previous snapshot (if any) stays in place
    /// and the failure is only logged and returned.
    pub async fn fetch(&self) -> Result<Arc<AnalyticsSnapshot>, CoreError> {
        let raw = match self.client.fetch_analytics().await {
            Ok(raw) => raw,
            Err(e) => {
                let err = CoreError::from(e);
                warn!(error = %err, "Failed to fetch analytics");
                return Err(err);
            }
        };

        let snapshot = Arc::new(AnalyticsSnapshot::from_response(raw, Utc::now()));
        debug!(
            points = snapshot.series.len(),
            pump_activations = snapshot.stats.pump_activations,
            "analytics refreshed"
        );
        self.store.replace_analytics(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use soilwatch_api::TransportConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::model::Stats;

    async fn setup() -> (MockServer, AnalyticsGateway, Arc<StateStore>) {
        let server = MockServer::start().await;
        let url = server.uri().parse().unwrap();
        let client = RelayClient::new(url, &TransportConfig::default()).unwrap();
        let store = Arc::new(StateStore::new());
        let gateway = AnalyticsGateway::new(client, Arc::clone(&store));
        (server, gateway, store)
    }

    fn analytics_body() -> serde_json::Value {
        json!({
            "historical_data": [
                { "time": "10:00", "temperature": 21.0, "humidity": 50.0, "soil_moisture": 3100.0 },
                { "time": "10:05", "temperature": 21.5, "humidity": 49.0, "soil_moisture": 3050.0 }
            ],
            "stats": {
                "avg_temp": 21.3,
                "avg_humidity": 49.5,
                "avg_moisture": 3075.0,
                "pump_activations": 4
            }
        })
    }

    #[tokio::test]
    async fn success_replaces_snapshot() {
        let (server, gateway, store) = setup().await;

        Mock::given(method("GET"))
            .and(path("/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(analytics_body()))
            .mount(&server)
            .await;

        let snapshot = gateway.fetch().await.unwrap();

        assert_eq!(
            snapshot.stats,
            Stats {
                avg_temp: 21.3,
                avg_humidity: 49.5,
                avg_moisture: 3075.0,
                pump_activations: 4,
            }
        );
        assert_eq!(snapshot.series.len(), 2);
        assert_eq!(store.analytics().as_deref(), Some(&*snapshot));
    }

    #[tokio::test]
    async fn failure_keeps_previous_snapshot() {
        let (server, gateway, store) = setup().await;

        Mock::given(method("GET"))
            .and(path("/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(analytics_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/analytics"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let first = gateway.fetch().await.unwrap();
        let err = gateway.fetch().await.unwrap_err();

        assert!(matches!(err, CoreError::Rejected { status: 500, .. }));
        assert_eq!(store.analytics().as_deref(), Some(&*first));
    }

    #[tokio::test]
    async fn failure_before_any_success_leaves_nothing() {
        let (server, gateway, store) = setup().await;

        Mock::given(method("GET"))
            .and(path("/analytics"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = gateway.fetch().await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidResponse { .. }));
        assert!(store.analytics().is_none());
    }

    #[tokio::test]
    async fn missing_series_is_empty_not_an_error() {
        let (server, gateway, _store) = setup().await;

        Mock::given(method("GET"))
            .and(path("/analytics"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "stats": { "avg_temp": 20.0 } })),
            )
            .mount(&server)
            .await;

        let snapshot = gateway.fetch().await.unwrap();
        assert!(snapshot.series.is_empty());
        assert_eq!(snapshot.stats.avg_temp, 20.0);
        assert_eq!(snapshot.stats.pump_activations, 0);
    }
}
