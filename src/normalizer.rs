/// Conversion of inbound transport payloads into canonical readings
use log::debug;
use serde_json::{Map, Value};
use std::collections::HashMap;
use time::OffsetDateTime;

use crate::models::Reading;

/// Shape of an inbound payload, decided once at the transport boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum RawPayload {
    /// JSON object with numeric (or numeric-string) fields.
    Structured(Map<String, Value>),
    /// Flat `key:value` pairs separated by commas, e.g. `pm25:12.5,co2:640`.
    Delimited(String),
}

impl RawPayload {
    /// Classify raw bytes: a JSON object is structured, anything else is
    /// treated as delimited text.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::Object(map)) => RawPayload::Structured(map),
            _ => RawPayload::Delimited(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Produce a canonical reading stamped with `received_at`.
///
/// Best effort: unparsable or missing fields are left absent and never
/// reported as an error.
pub fn normalize(payload: &RawPayload, received_at: OffsetDateTime) -> Reading {
    let fields = match payload {
        RawPayload::Structured(map) => structured_fields(map),
        RawPayload::Delimited(text) => delimited_fields(text),
    };

    let field = |names: &[&str]| names.iter().find_map(|name| fields.get(*name).copied());

    Reading {
        timestamp: received_at,
        pm25: field(&["pm25"]),
        co2: field(&["co2"]),
        co: field(&["co"]),
        temperature: field(&["temperature", "temp"]),
        humidity: field(&["humidity", "hum"]),
    }
}

fn structured_fields(map: &Map<String, Value>) -> HashMap<String, f64> {
    let mut fields = HashMap::new();
    for (key, value) in map {
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if let Some(number) = number.filter(|n| n.is_finite()) {
            fields.insert(key.trim().to_lowercase(), number);
        }
    }
    fields
}

fn delimited_fields(text: &str) -> HashMap<String, f64> {
    let mut fields = HashMap::new();
    for pair in text.split(',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() || value.is_empty() {
            continue;
        }
        match value.parse::<f64>() {
            Ok(number) if number.is_finite() => {
                fields.insert(key.to_lowercase(), number);
            }
            _ => debug!("Skipping unparsable value for '{}': '{}'", key, value),
        }
    }
    fields
}
