use serde::Serialize;
use std::fmt;
use time::OffsetDateTime;

/// Canonical point-in-time measurement.
///
/// Every sensor field is optional: a payload may omit any of them and the
/// absence is carried through to display and export instead of being
/// defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: OffsetDateTime,
    pub pm25: Option<f64>,
    pub co2: Option<f64>,
    pub co: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl Reading {
    /// A reading with every sensor absent.
    #[cfg(test)]
    pub fn empty(timestamp: OffsetDateTime) -> Self {
        Reading {
            timestamp,
            pm25: None,
            co2: None,
            co: None,
            temperature: None,
            humidity: None,
        }
    }

    /// Value of one sensor metric. The derived `Aqi` metric is not a field
    /// and always yields `None`; use `engine::analytics::overall_aqi` for it.
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Pm25 => self.pm25,
            Metric::Co2 => self.co2,
            Metric::Co => self.co,
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::Aqi => None,
        }
    }
}

/// Metrics known to the classification table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Pm25,
    Co2,
    Co,
    Temperature,
    Humidity,
    Aqi,
}

impl Metric {
    /// The five physical sensors, in display order.
    pub const SENSORS: [Metric; 5] = [
        Metric::Pm25,
        Metric::Co2,
        Metric::Co,
        Metric::Temperature,
        Metric::Humidity,
    ];

    /// Parse a metric name, case-insensitively, accepting payload aliases.
    pub fn parse(name: &str) -> Option<Metric> {
        match name.trim().to_lowercase().as_str() {
            "pm25" | "pm2.5" | "pm2_5" => Some(Metric::Pm25),
            "co2" => Some(Metric::Co2),
            "co" => Some(Metric::Co),
            "temperature" | "temp" => Some(Metric::Temperature),
            "humidity" | "hum" => Some(Metric::Humidity),
            "aqi" | "overall_aqi" => Some(Metric::Aqi),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Pm25 => "pm25",
            Metric::Co2 => "co2",
            Metric::Co => "co",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
            Metric::Aqi => "aqi",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Pm25 => "µg/m³",
            Metric::Co2 | Metric::Co => "ppm",
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::Aqi => "AQI",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Three-tier qualitative class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AirClass {
    Good,
    Moderate,
    Poor,
}

impl fmt::Display for AirClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AirClass::Good => "good",
            AirClass::Moderate => "moderate",
            AirClass::Poor => "poor",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub class: AirClass,
    pub label: &'static str,
}

/// Per-metric arithmetic means over a set of readings.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AverageData {
    pub pm25: Option<f64>,
    pub co2: Option<f64>,
    pub co: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub samples: usize,
}
