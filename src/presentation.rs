/// Display-ready output handed to the presentation layer
use log::{error, info};
use serde::Serialize;

use crate::engine::advisory::{AcademicImpact, HealthRisk, PerformanceIndex};
use crate::engine::analytics::{ComplianceStatus, Peak};
use crate::engine::anomaly::TamperStatus;
use crate::engine::prediction::Prediction;
use crate::models::{Classification, Metric};
use crate::transport::ConnectionStatus;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDisplay {
    pub metric: Metric,
    pub value: Option<f64>,
    pub unit: &'static str,
    pub classification: Option<Classification>,
}

/// Everything one display tick shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFrame {
    pub timestamp: String,
    pub reading_timestamp: String,
    pub connection: ConnectionStatus,
    pub metrics: Vec<MetricDisplay>,
    pub overall_aqi: f64,
    pub aqi_classification: Classification,
    pub pm25_sub_index: Option<u32>,
    pub prediction: Prediction,
    pub prediction_classification: Option<Classification>,
    pub performance: PerformanceIndex,
    pub ventilation_advice: Vec<String>,
    pub occupancy: u32,
    pub comfort: &'static str,
    pub anomalies: Vec<&'static str>,
    pub peak: Peak<String>,
    pub ventilation_efficiency: f64,
    pub carbon_kg: f64,
    pub compliance: ComplianceStatus,
    pub health_advisory: &'static str,
    pub health_risk: HealthRisk,
    pub escalation: &'static str,
    pub academic_impact: AcademicImpact,
    pub tamper: TamperStatus,
    pub fan_on: bool,
    pub co_emergency: bool,
    pub history_len: usize,
}

/// Receiver of finished display frames.
pub trait PresentationSink {
    fn present(&self, frame: &DisplayFrame);
}

/// Writes each frame as a single JSON log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn present(&self, frame: &DisplayFrame) {
        match serde_json::to_string(frame) {
            Ok(json) => info!("Display frame: {}", json),
            Err(e) => error!("Failed to serialize display frame: {}", e),
        }
    }
}
