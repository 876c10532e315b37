//! Occupant-facing advice derived from the latest reading.
//!
//! Precedence-sensitive advice (ventilation, thermal comfort) is written as
//! ordered rule tables.

use serde::Serialize;

use super::rules::{evaluate, first_match, Rule};

pub const CO2_HIGH_PPM: f64 = 1000.0;
pub const PM25_FILTER_THRESHOLD: f64 = 35.0;
pub const OUTDOOR_POOR_AQI: f64 = 100.0;
pub const OUTDOOR_VERY_POOR_AQI: f64 = 150.0;

pub const MECHANICAL_VENTILATION: &str = "CO2 High but Outdoor Air Poor. Use Mechanical Ventilation.";
pub const OPEN_WINDOWS: &str = "Open windows to reduce CO2.";
pub const ENABLE_FILTRATION: &str = "Enable air purifier / filters.";
pub const KEEP_WINDOWS_CLOSED: &str = "Keep windows closed (Outdoor Pollution).";
pub const AIR_QUALITY_GOOD: &str = "Air quality is good. Maintain current settings.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceIndex {
    pub score: u8,
    pub label: &'static str,
}

/// Classroom performance score from CO2.
pub fn performance_index(co2: f64) -> PerformanceIndex {
    let (score, label) = if co2 <= 800.0 {
        (100, "Optimal Learning Zone")
    } else if co2 <= 1200.0 {
        (80, "Good Concentration")
    } else if co2 <= 1500.0 {
        (60, "Mild Drowsiness")
    } else {
        (40, "Poor Focus - Ventilate!")
    };
    PerformanceIndex { score, label }
}

struct VentilationInput {
    co2: f64,
    pm25: f64,
    outdoor_aqi: f64,
}

const VENTILATION_RULES: [Rule<VentilationInput>; 4] = [
    Rule::terminal(
        |i: &VentilationInput| i.co2 > CO2_HIGH_PPM && i.outdoor_aqi > OUTDOOR_POOR_AQI,
        MECHANICAL_VENTILATION,
    ),
    Rule::additive(|i: &VentilationInput| i.co2 > CO2_HIGH_PPM, OPEN_WINDOWS),
    Rule::additive(|i: &VentilationInput| i.pm25 > PM25_FILTER_THRESHOLD, ENABLE_FILTRATION),
    Rule::additive(|i: &VentilationInput| i.outdoor_aqi > OUTDOOR_VERY_POOR_AQI, KEEP_WINDOWS_CLOSED),
];

/// Ordered ventilation advice. Never empty.
pub fn ventilation_advice(co2: f64, pm25: f64, outdoor_aqi: f64) -> Vec<String> {
    let input = VentilationInput {
        co2,
        pm25,
        outdoor_aqi,
    };
    let mut advice: Vec<String> = evaluate(&VENTILATION_RULES, &input)
        .into_iter()
        .map(String::from)
        .collect();
    if advice.is_empty() {
        advice.push(AIR_QUALITY_GOOD.to_string());
    }
    advice
}

pub const OCCUPANCY_BASELINE_PPM: f64 = 400.0;
pub const PPM_PER_PERSON: f64 = 60.0;

/// Rough head count from CO2 above the outdoor baseline.
pub fn estimate_occupancy(co2: f64) -> u32 {
    let excess = (co2 - OCCUPANCY_BASELINE_PPM).max(0.0);
    let people = (excess / PPM_PER_PERSON).round();
    if people.is_finite() {
        people as u32
    } else {
        0
    }
}

struct Climate {
    temperature: f64,
    humidity: f64,
}

const COMFORT_RULES: [Rule<Climate>; 5] = [
    Rule::terminal(
        |c: &Climate| (20.0..=26.0).contains(&c.temperature) && (30.0..=60.0).contains(&c.humidity),
        "Comfortable",
    ),
    Rule::terminal(|c: &Climate| c.temperature > 26.0 && c.humidity > 60.0, "Warm & Humid"),
    Rule::terminal(|c: &Climate| c.temperature > 26.0, "Warm"),
    Rule::terminal(|c: &Climate| c.temperature < 20.0, "Cool"),
    Rule::terminal(|c: &Climate| c.humidity > 70.0, "Too Humid"),
];

/// Six-way comfort label; bands overlap, first match wins.
pub fn thermal_comfort(temperature: f64, humidity: f64) -> &'static str {
    let climate = Climate {
        temperature,
        humidity,
    };
    first_match(&COMFORT_RULES, &climate).unwrap_or("Slightly Uncomfortable")
}

pub const SENSITIVE_ALERT: &str = "ASTHMA ALERT: Air quality may trigger symptoms. Keep inhaler ready.";
pub const SENSITIVE_SAFE: &str = "ASTHMA SAFE: Condition is optimal.";
pub const DANGER: &str = "DANGER: Avoid prolonged exertion.";
pub const UNHEALTHY: &str = "UNHEALTHY: Sensitive groups should reduce activity.";
pub const SATISFACTORY: &str = "Air quality is satisfactory.";

/// Health advisory; sensitive mode and standard mode are separate branches.
pub fn health_advisory(aqi: f64, co2: f64, sensitive_mode: bool) -> &'static str {
    if sensitive_mode {
        if aqi > 50.0 || co2 > 800.0 {
            SENSITIVE_ALERT
        } else {
            SENSITIVE_SAFE
        }
    } else if aqi > 150.0 {
        DANGER
    } else if aqi > 100.0 {
        UNHEALTHY
    } else {
        SATISFACTORY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthRisk {
    pub level: &'static str,
    pub risk: &'static str,
}

pub fn health_risk(aqi: f64) -> HealthRisk {
    if aqi > 200.0 {
        HealthRisk {
            level: "High",
            risk: "Asthma/Allergy Warning",
        }
    } else if aqi > 100.0 {
        HealthRisk {
            level: "Moderate",
            risk: "Sensitive Groups Warning",
        }
    } else {
        HealthRisk {
            level: "Low",
            risk: "Safe for All",
        }
    }
}

/// Who gets notified for a given AQI.
pub fn alert_escalation(aqi: f64) -> &'static str {
    if aqi > 300.0 {
        "Level 3: Notify Campus Maintenance"
    } else if aqi > 200.0 {
        "Level 2: Notify Admin"
    } else if aqi > 150.0 {
        "Level 1: Notify Class Representative"
    } else {
        "Normal"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AcademicImpact {
    pub score: &'static str,
    pub cognitive_loss: &'static str,
}

pub fn academic_impact(co2: f64) -> AcademicImpact {
    let (score, cognitive_loss) = if co2 < 600.0 {
        ("Optimal", "0%")
    } else if co2 < 1000.0 {
        ("Good", "~5%")
    } else if co2 < 1400.0 {
        ("Impaired", "~15%")
    } else {
        ("Critical", ">50%")
    };
    AcademicImpact {
        score,
        cognitive_loss,
    }
}

pub const FAN_ON_CO2_PPM: f64 = 800.0;
pub const CO_EMERGENCY_PPM: f64 = 50.0;

pub fn fan_on(co2: f64) -> bool {
    co2 > FAN_ON_CO2_PPM
}

pub fn co_emergency(co: f64) -> bool {
    co > CO_EMERGENCY_PPM
}
