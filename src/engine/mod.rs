/// Derived-metrics engine and the per-dashboard state it mutates
pub mod advisory;
pub mod analytics;
pub mod anomaly;
pub mod prediction;
pub mod rules;

use log::{debug, warn};
use time::OffsetDateTime;

use crate::error::DashboardError;
use crate::history::{HistoryStore, DEFAULT_CAPACITY};
use crate::models::{Metric, Reading};
use crate::presentation::{DisplayFrame, MetricDisplay};
use crate::thresholds::ThresholdSet;
use crate::transport::ConnectionStatus;
use crate::utils::{iso_timestamp, round_decimals};

use analytics::{
    carbon_footprint, check_compliance, find_peak, overall_aqi, pm25_sub_index,
    ventilation_efficiency, Peak, DEFAULT_HVAC_POWER_KW,
};
use anomaly::{detect_anomalies, TamperStatus, TamperTracker};
use prediction::{predict_next_hour, Prediction, WINDOW};

// Stand-ins for absent fields when a calculator needs a number.
const FALLBACK_CO2: f64 = 400.0;
const FALLBACK_PM25: f64 = 0.0;
const FALLBACK_CO: f64 = 0.0;
const FALLBACK_TEMPERATURE: f64 = 25.0;
const FALLBACK_HUMIDITY: f64 = 50.0;

/// Nominal spacing between live readings.
const READING_INTERVAL_MINUTES: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub history_capacity: usize,
    pub outdoor_aqi: f64,
    pub sensitive_mode: bool,
    pub hvac_power_kw: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            history_capacity: DEFAULT_CAPACITY,
            outdoor_aqi: 50.0,
            sensitive_mode: false,
            hvac_power_kw: DEFAULT_HVAC_POWER_KW,
        }
    }
}

/// What a single ingested reading triggered.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub anomalies: Vec<&'static str>,
    pub tamper: TamperStatus,
}

/// All mutable state of one dashboard instance.
///
/// Owned by a single task; every reading is applied through `ingest`, so
/// history, tamper tracking and thresholds change together.
#[derive(Debug)]
pub struct DashboardState {
    settings: EngineSettings,
    history: HistoryStore,
    tamper: TamperTracker,
    thresholds: ThresholdSet,
    connection: ConnectionStatus,
    last_anomalies: Vec<&'static str>,
    last_tamper: TamperStatus,
    last_persisted: Option<OffsetDateTime>,
}

impl DashboardState {
    pub fn new(settings: EngineSettings) -> Self {
        DashboardState {
            history: HistoryStore::new(settings.history_capacity),
            settings,
            tamper: TamperTracker::new(),
            thresholds: ThresholdSet::default(),
            connection: ConnectionStatus::Connecting,
            last_anomalies: Vec::new(),
            last_tamper: TamperStatus::Clear,
            last_persisted: None,
        }
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Record a connection transition; returns whether it changed.
    pub fn set_connection(&mut self, status: ConnectionStatus) -> bool {
        let changed = self.connection != status;
        self.connection = status;
        changed
    }

    pub fn set_threshold(&mut self, metric_name: &str, value: f64) -> Result<(), DashboardError> {
        self.thresholds.set_threshold(metric_name, value)
    }

    pub fn set_exam_mode(&mut self, enabled: bool) -> Result<(), DashboardError> {
        self.thresholds.set_exam_mode(enabled)
    }

    /// Apply one canonical reading.
    pub fn ingest(&mut self, reading: Reading) -> IngestOutcome {
        let anomalies = detect_anomalies(&reading, self.history.latest());
        let tamper = self.tamper.check(&reading);

        for anomaly in &anomalies {
            warn!("Anomaly detected: {}", anomaly);
        }
        if let Some(message) = tamper.message() {
            warn!("{}", message);
        }
        debug!(
            "Ingested reading at {}: pm25={:?} co2={:?} co={:?} temp={:?} hum={:?}",
            iso_timestamp(&reading.timestamp),
            reading.pm25,
            reading.co2,
            reading.co,
            reading.temperature,
            reading.humidity
        );

        self.history.append(reading);
        self.last_anomalies = anomalies.clone();
        self.last_tamper = tamper;

        IngestOutcome { anomalies, tamper }
    }

    /// Latest reading not yet handed to persistence, if any.
    ///
    /// The reading is marked as handed over immediately; a failing sink does
    /// not cause it to be offered again.
    pub fn take_unpersisted(&mut self) -> Option<Reading> {
        let latest = self.history.latest()?;
        if self.last_persisted == Some(latest.timestamp) {
            return None;
        }
        self.last_persisted = Some(latest.timestamp);
        Some(latest.clone())
    }

    /// Build the display frame for the latest reading; `None` before any
    /// reading has arrived.
    pub fn frame(&self, now: OffsetDateTime) -> Option<DisplayFrame> {
        let latest = self.history.latest()?;

        let metrics = Metric::SENSORS
            .iter()
            .map(|&metric| {
                let value = latest.get(metric);
                MetricDisplay {
                    metric,
                    value,
                    unit: metric.unit(),
                    classification: value.map(|v| self.thresholds.classify(metric, v)),
                }
            })
            .collect();

        let co2 = latest.co2.unwrap_or(FALLBACK_CO2);
        let pm25 = latest.pm25.unwrap_or(FALLBACK_PM25);
        let co = latest.co.unwrap_or(FALLBACK_CO);
        let temperature = latest.temperature.unwrap_or(FALLBACK_TEMPERATURE);
        let humidity = latest.humidity.unwrap_or(FALLBACK_HUMIDITY);
        let aqi = overall_aqi(latest);

        let prediction = predict_next_hour(&self.history.recent_values(Metric::Pm25, WINDOW));
        let prediction_classification = match prediction {
            Prediction::Value(v) => Some(self.thresholds.classify(Metric::Aqi, v as f64)),
            Prediction::InsufficientData => None,
        };

        Some(DisplayFrame {
            timestamp: iso_timestamp(&now),
            reading_timestamp: iso_timestamp(&latest.timestamp),
            connection: self.connection,
            metrics,
            overall_aqi: round_decimals(aqi, 1),
            aqi_classification: self.thresholds.classify(Metric::Aqi, aqi),
            pm25_sub_index: latest.pm25.map(pm25_sub_index),
            prediction,
            prediction_classification,
            performance: advisory::performance_index(co2),
            ventilation_advice: advisory::ventilation_advice(co2, pm25, self.settings.outdoor_aqi),
            occupancy: advisory::estimate_occupancy(co2),
            comfort: advisory::thermal_comfort(temperature, humidity),
            anomalies: self.last_anomalies.clone(),
            peak: self.peak_aqi(),
            ventilation_efficiency: round_decimals(self.recent_efficiency(), 1),
            carbon_kg: round_decimals(self.carbon_estimate(), 2),
            compliance: check_compliance(pm25, co2),
            health_advisory: advisory::health_advisory(aqi, co2, self.settings.sensitive_mode),
            health_risk: advisory::health_risk(aqi),
            escalation: advisory::alert_escalation(aqi),
            academic_impact: advisory::academic_impact(co2),
            tamper: self.last_tamper,
            fan_on: advisory::fan_on(co2),
            co_emergency: advisory::co_emergency(co),
            history_len: self.history.len(),
        })
    }

    fn peak_aqi(&self) -> Peak<String> {
        let timestamps = self.history.timestamps();
        let values: Vec<f64> = self.history.iter().map(overall_aqi).collect();
        match find_peak(&timestamps, &values) {
            Peak::At { timestamp, value } => Peak::At {
                timestamp: iso_timestamp(&timestamp),
                value: round_decimals(value, 1),
            },
            Peak::NotAvailable => Peak::NotAvailable,
        }
    }

    /// Efficiency between the two most recent readings.
    fn recent_efficiency(&self) -> f64 {
        let (Some(previous), Some(latest)) = (self.history.previous(), self.history.latest())
        else {
            return 0.0;
        };
        let start = previous.co2.unwrap_or(FALLBACK_CO2);
        let end = latest.co2.unwrap_or(start);
        ventilation_efficiency(start, end, READING_INTERVAL_MINUTES)
    }

    /// Carbon estimate for the span covered by history, at least one minute.
    fn carbon_estimate(&self) -> f64 {
        let hours = self.history.len().max(1) as f64 / 60.0;
        carbon_footprint(hours, self.settings.hvac_power_kw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AirClass;
    use time::macros::datetime;
    use time::Duration;

    fn reading(minute: i64, co2: f64, pm25: f64) -> Reading {
        let mut r = Reading::empty(datetime!(2024-06-03 08:00 UTC) + Duration::minutes(minute));
        r.co2 = Some(co2);
        r.pm25 = Some(pm25);
        r.temperature = Some(22.0);
        r.humidity = Some(45.0);
        r
    }

    fn now() -> OffsetDateTime {
        datetime!(2024-06-03 12:00 UTC)
    }

    #[test]
    fn no_frame_before_first_reading() {
        let state = DashboardState::new(EngineSettings::default());
        assert!(state.frame(now()).is_none());
    }

    #[test]
    fn first_reading_never_flags_anomalies() {
        let mut state = DashboardState::new(EngineSettings::default());
        let outcome = state.ingest(reading(0, 0.0, 5.0));
        assert!(outcome.anomalies.is_empty());
        assert_eq!(outcome.tamper, TamperStatus::Clear);
    }

    #[test]
    fn spike_is_detected_against_previous_reading() {
        let mut state = DashboardState::new(EngineSettings::default());
        state.ingest(reading(0, 500.0, 10.0));
        let outcome = state.ingest(reading(1, 650.0, 10.0));
        assert_eq!(outcome.anomalies, vec![anomaly::CO2_SPIKE]);

        let frame = state.frame(now()).unwrap();
        assert_eq!(frame.anomalies, vec![anomaly::CO2_SPIKE]);
    }

    #[test]
    fn frame_reflects_latest_reading() {
        let mut state = DashboardState::new(EngineSettings::default());
        state.ingest(reading(0, 1000.0, 12.0));
        state.ingest(reading(1, 850.0, 12.0));

        let frame = state.frame(now()).unwrap();
        assert_eq!(frame.history_len, 2);
        assert_eq!(frame.overall_aqi, 85.0);
        assert_eq!(frame.aqi_classification.class, AirClass::Moderate);
        assert_eq!(frame.prediction, Prediction::InsufficientData);
        assert!(frame.prediction_classification.is_none());
        assert_eq!(frame.performance.score, 80);
        assert_eq!(frame.occupancy, 8);
        assert_eq!(frame.comfort, "Comfortable");
        assert_eq!(frame.ventilation_efficiency, 100.0);
        assert!(frame.fan_on);
        assert!(!frame.co_emergency);
        assert_eq!(
            frame.peak,
            Peak::At {
                timestamp: "2024-06-03T08:00:00Z".to_string(),
                value: 100.0
            }
        );

        let co2 = frame
            .metrics
            .iter()
            .find(|m| m.metric == Metric::Co2)
            .unwrap();
        assert_eq!(co2.value, Some(850.0));
        assert_eq!(co2.unit, "ppm");
        assert_eq!(co2.classification.map(|c| c.class), Some(AirClass::Moderate));

        let co = frame.metrics.iter().find(|m| m.metric == Metric::Co).unwrap();
        assert_eq!(co.value, None);
        assert!(co.classification.is_none());
    }

    #[test]
    fn prediction_appears_after_ten_pm25_values() {
        let mut state = DashboardState::new(EngineSettings::default());
        for i in 0..9 {
            state.ingest(reading(i, 500.0 + i as f64, 10.0 + i as f64));
        }
        assert_eq!(state.frame(now()).unwrap().prediction, Prediction::InsufficientData);

        state.ingest(reading(9, 509.0, 19.0));
        let frame = state.frame(now()).unwrap();
        assert_eq!(frame.prediction, Prediction::Value(79));
        assert_eq!(
            frame.prediction_classification.map(|c| c.class),
            Some(AirClass::Moderate)
        );
    }

    #[test]
    fn threshold_update_applies_to_next_frame_only() {
        let mut state = DashboardState::new(EngineSettings::default());
        state.ingest(reading(0, 900.0, 10.0));
        let before = state.frame(now()).unwrap();

        state.set_threshold("co2", 800.0).unwrap();
        let after = state.frame(now()).unwrap();

        let class_of = |frame: &DisplayFrame| {
            frame
                .metrics
                .iter()
                .find(|m| m.metric == Metric::Co2)
                .and_then(|m| m.classification)
                .map(|c| c.class)
        };
        assert_eq!(class_of(&before), Some(AirClass::Moderate));
        assert_eq!(class_of(&after), Some(AirClass::Poor));
    }

    #[test]
    fn unpersisted_reading_is_offered_once() {
        let mut state = DashboardState::new(EngineSettings::default());
        assert!(state.take_unpersisted().is_none());

        state.ingest(reading(0, 500.0, 10.0));
        assert!(state.take_unpersisted().is_some());
        assert!(state.take_unpersisted().is_none());

        state.ingest(reading(1, 510.0, 10.0));
        assert_eq!(state.take_unpersisted().and_then(|r| r.co2), Some(510.0));
    }

    #[test]
    fn sensitive_mode_changes_health_advisory() {
        let settings = EngineSettings {
            sensitive_mode: true,
            ..EngineSettings::default()
        };
        let mut state = DashboardState::new(settings);
        state.ingest(reading(0, 900.0, 10.0));
        assert_eq!(
            state.frame(now()).unwrap().health_advisory,
            advisory::SENSITIVE_ALERT
        );
    }

    #[test]
    fn outdoor_aqi_drives_ventilation_override() {
        let settings = EngineSettings {
            outdoor_aqi: 150.0,
            ..EngineSettings::default()
        };
        let mut state = DashboardState::new(settings);
        state.ingest(reading(0, 1200.0, 10.0));
        assert_eq!(
            state.frame(now()).unwrap().ventilation_advice,
            vec![advisory::MECHANICAL_VENTILATION.to_string()]
        );
    }

    #[test]
    fn connection_changes_are_reported() {
        let mut state = DashboardState::new(EngineSettings::default());
        assert_eq!(state.connection(), ConnectionStatus::Connecting);
        assert!(state.set_connection(ConnectionStatus::Connected));
        assert!(!state.set_connection(ConnectionStatus::Connected));
        assert!(state.set_connection(ConnectionStatus::Offline));
    }

    #[test]
    fn carbon_grows_with_history() {
        let mut state = DashboardState::new(EngineSettings::default());
        state.ingest(reading(0, 500.0, 10.0));
        // One minute at 2.5 kW: 2.5 / 60 * 0.85
        assert_eq!(state.frame(now()).unwrap().carbon_kg, 0.04);
        for i in 1..30 {
            state.ingest(reading(i, 500.0 + i as f64, 10.0));
        }
        // Half an hour: 0.5 * 2.5 * 0.85
        assert_eq!(state.frame(now()).unwrap().carbon_kg, 1.06);
    }
}
