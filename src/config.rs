use log::{info, warn};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::engine::analytics::DEFAULT_HVAC_POWER_KW;
use crate::engine::EngineSettings;
use crate::error::DashboardError;
use crate::history::DEFAULT_CAPACITY;

#[derive(Debug, Clone)]
pub struct MqttSettings {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keepalive_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub mqtt: MqttSettings,
    pub database_url: Option<String>,
    pub history_capacity: usize,
    pub display_interval_secs: u64,
    pub persist_interval_secs: u64,
    pub outdoor_aqi: f64,
    pub sensitive_mode: bool,
    pub exam_mode: bool,
    pub hvac_power_kw: f64,
    /// Start-up threshold overrides as (metric name, value), from `THRESHOLD_<METRIC>`.
    pub thresholds: Vec<(String, f64)>,
    pub export_dir: Option<PathBuf>,
}

impl DashboardConfig {
    pub fn new() -> Result<Self, DashboardError> {
        // Load environment variables
        dotenv::dotenv().ok();
        Self::from_vars(env::vars().collect())
    }

    /// Build the configuration from a set of variables.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, DashboardError> {
        let text = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mqtt = MqttSettings {
            host: text("MQTT_HOST").unwrap_or_else(|| "localhost".to_string()),
            port: parse_or(&vars, "MQTT_PORT", 1883)?,
            topic: text("MQTT_TOPIC").unwrap_or_else(|| "esp32/sensor".to_string()),
            client_id: text("MQTT_CLIENT_ID").unwrap_or_else(|| "aerosense-monitor".to_string()),
            username: text("MQTT_USERNAME"),
            password: text("MQTT_PASSWORD"),
            keepalive_secs: parse_or(&vars, "MQTT_KEEPALIVE_SECS", 30)?,
        };

        let database_url = text("DATABASE_URL");
        if database_url.is_none() {
            warn!("DATABASE_URL not set, readings will not be persisted");
        }

        let history_capacity = parse_or(&vars, "HISTORY_CAPACITY", DEFAULT_CAPACITY)?;
        if history_capacity == 0 {
            return Err(DashboardError::Config(
                "HISTORY_CAPACITY must be at least 1".into(),
            ));
        }

        let display_interval_secs = parse_or(&vars, "DISPLAY_INTERVAL_SECS", 5)?;
        let persist_interval_secs = parse_or(&vars, "PERSIST_INTERVAL_SECS", 60)?;
        if display_interval_secs == 0 || persist_interval_secs == 0 {
            return Err(DashboardError::Config(
                "DISPLAY_INTERVAL_SECS and PERSIST_INTERVAL_SECS must be at least 1".into(),
            ));
        }

        let mut thresholds = Vec::new();
        for (key, value) in &vars {
            if let Some(metric) = key.strip_prefix("THRESHOLD_") {
                let parsed = value.trim().parse::<f64>().map_err(|_| {
                    DashboardError::Config(format!("{} is not a number: '{}'", key, value))
                })?;
                thresholds.push((metric.to_lowercase(), parsed));
            }
        }
        thresholds.sort_by(|a, b| a.0.cmp(&b.0));

        let config = DashboardConfig {
            mqtt,
            database_url,
            history_capacity,
            display_interval_secs,
            persist_interval_secs,
            outdoor_aqi: parse_or(&vars, "OUTDOOR_AQI", 50.0)?,
            sensitive_mode: parse_flag(&vars, "SENSITIVE_MODE")?,
            exam_mode: parse_flag(&vars, "EXAM_MODE")?,
            hvac_power_kw: parse_or(&vars, "HVAC_POWER_KW", DEFAULT_HVAC_POWER_KW)?,
            thresholds,
            export_dir: text("EXPORT_DIR").map(PathBuf::from),
        };

        info!(
            "MQTT broker {}:{} topic '{}', history capacity {}",
            config.mqtt.host, config.mqtt.port, config.mqtt.topic, config.history_capacity
        );
        for (metric, value) in &config.thresholds {
            info!("Threshold override: {} -> {}", metric, value);
        }

        Ok(config)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            history_capacity: self.history_capacity,
            outdoor_aqi: self.outdoor_aqi,
            sensitive_mode: self.sensitive_mode,
            hvac_power_kw: self.hvac_power_kw,
        }
    }
}

fn parse_or<T: FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, DashboardError> {
    match vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| DashboardError::Config(format!("{} has an invalid value: '{}'", key, raw))),
    }
}

fn parse_flag(vars: &HashMap<String, String>, key: &str) -> Result<bool, DashboardError> {
    match vars.get(key).map(|v| v.trim().to_lowercase()).as_deref() {
        None | Some("") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(DashboardError::Config(format!(
            "{} must be true or false, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = DashboardConfig::from_vars(HashMap::new()).unwrap();
        assert_eq!(config.mqtt.host, "localhost");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.mqtt.topic, "esp32/sensor");
        assert!(config.mqtt.username.is_none());
        assert!(config.database_url.is_none());
        assert_eq!(config.history_capacity, 1440);
        assert_eq!(config.display_interval_secs, 5);
        assert_eq!(config.persist_interval_secs, 60);
        assert_eq!(config.outdoor_aqi, 50.0);
        assert!(!config.sensitive_mode);
        assert!(!config.exam_mode);
        assert_eq!(config.hvac_power_kw, 2.5);
        assert!(config.thresholds.is_empty());
        assert!(config.export_dir.is_none());
    }

    #[test]
    fn reads_overrides() {
        let config = DashboardConfig::from_vars(vars(&[
            ("MQTT_HOST", "broker.local"),
            ("MQTT_PORT", "8883"),
            ("MQTT_USERNAME", "dash"),
            ("DATABASE_URL", "postgres://db/aq?sslrootcert=/ca.pem"),
            ("HISTORY_CAPACITY", "60"),
            ("SENSITIVE_MODE", "TRUE"),
            ("EXAM_MODE", "1"),
            ("OUTDOOR_AQI", "120"),
            ("THRESHOLD_CO2", "900"),
            ("THRESHOLD_PM25", "30"),
            ("EXPORT_DIR", "/tmp/exports"),
        ]))
        .unwrap();

        assert_eq!(config.mqtt.host, "broker.local");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.username.as_deref(), Some("dash"));
        assert!(config.database_url.is_some());
        assert_eq!(config.history_capacity, 60);
        assert!(config.sensitive_mode);
        assert!(config.exam_mode);
        assert_eq!(config.outdoor_aqi, 120.0);
        assert_eq!(
            config.thresholds,
            vec![("co2".to_string(), 900.0), ("pm25".to_string(), 30.0)]
        );
        assert_eq!(config.export_dir, Some(PathBuf::from("/tmp/exports")));

        let settings = config.engine_settings();
        assert_eq!(settings.history_capacity, 60);
        assert!(settings.sensitive_mode);
    }

    #[test]
    fn rejects_unparsable_numbers() {
        let err = DashboardConfig::from_vars(vars(&[("MQTT_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, DashboardError::Config(_)));

        assert!(DashboardConfig::from_vars(vars(&[("THRESHOLD_CO2", "high")])).is_err());
        assert!(DashboardConfig::from_vars(vars(&[("SENSITIVE_MODE", "maybe")])).is_err());
    }

    #[test]
    fn rejects_zero_capacity_and_intervals() {
        assert!(DashboardConfig::from_vars(vars(&[("HISTORY_CAPACITY", "0")])).is_err());
        assert!(DashboardConfig::from_vars(vars(&[("DISPLAY_INTERVAL_SECS", "0")])).is_err());
    }
}
