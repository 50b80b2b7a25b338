// ── Telemetry frame validation ──
//
// Pure: a raw event payload either becomes a whole `SensorReading` or is
// rejected. Only the three numeric fields gate acceptance.

use serde_json::Value;
use thiserror::Error;

use crate::model::SensorReading;

/// Why a telemetry frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("frame is not valid JSON: {0}")]
    Malformed(String),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame is missing `{0}`")]
    MissingField(&'static str),

    #[error("`{field}` is {found}, expected a number")]
    NotNumeric { field: &'static str, found: &'static str },
}

/// Decode and validate one telemetry frame.
pub fn validate_frame(raw: &str) -> Result<SensorReading, ValidationError> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    validate_payload(&value)
}

/// Validate an already-decoded payload.
///
/// `water_pump` is read as-is when it is a boolean; anything else reads
/// as `false`, which is how the device reports an idle pump.
pub fn validate_payload(value: &Value) -> Result<SensorReading, ValidationError> {
    let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

    let number = |field: &'static str| -> Result<f64, ValidationError> {
        let v = obj.get(field).ok_or(ValidationError::MissingField(field))?;
        v.as_f64().ok_or(ValidationError::NotNumeric {
            field,
            found: json_type(v),
        })
    };

    let temperature = number("temperature")?;
    let humidity = number("humidity")?;
    let soil_moisture = number("soil_moisture")?;

    let water_pump = match obj.get("water_pump") {
        Some(Value::Bool(b)) => *b,
        other => {
            tracing::debug!(found = other.map_or("absent", json_type), "water_pump is not a boolean");
            false
        }
    };

    Ok(SensorReading {
        temperature,
        humidity,
        soil_moisture,
        water_pump,
    })
}

fn json_type(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
