// ── Wire → domain conversions ──
//
// Maps relay field names (`avg_temp`, `pump_activations`, ...) onto the
// view model. Absent values become zero, an absent series becomes empty.

use chrono::{DateTime, Utc};

use soilwatch_api::{AnalyticsResponse, HistoricalDataPoint, StatsPayload};

use crate::model::{AnalyticsSnapshot, HistoricalPoint, Stats};

impl From<StatsPayload> for Stats {
    fn from(raw: StatsPayload) -> Self {
        Self {
            avg_temp: raw.avg_temp.unwrap_or_default(),
            avg_humidity: raw.avg_humidity.unwrap_or_default(),
            avg_moisture: raw.avg_moisture.unwrap_or_default(),
            pump_activations: raw.pump_activations.unwrap_or_default(),
        }
    }
}

impl From<HistoricalDataPoint> for HistoricalPoint {
    fn from(raw: HistoricalDataPoint) -> Self {
        Self {
            time: raw.time.unwrap_or_default(),
            temperature: raw.temperature.unwrap_or_default(),
            humidity: raw.humidity.unwrap_or_default(),
            soil_moisture: raw.soil_moisture.unwrap_or_default(),
        }
    }
}

impl AnalyticsSnapshot {
    /// Build a snapshot from a relay response, stamped with `fetched_at`.
    pub fn from_response(raw: AnalyticsResponse, fetched_at: DateTime<Utc>) -> Self {
        Self {
            stats: raw.stats.map(Stats::from).unwrap_or_default(),
            series: raw
                .historical_data
                .unwrap_or_default()
                .into_iter()
                .map(HistoricalPoint::from)
                .collect(),
            fetched_at,
        }
    }
}
