//! Aggregate figures: AQI, peaks, ventilation efficiency, carbon and compliance.

use serde::Serialize;

use crate::models::Reading;

/// Dashboard-level AQI: the largest of the scaled sensor values.
///
/// Absent fields count as zero.
pub fn overall_aqi(reading: &Reading) -> f64 {
    let pm25 = reading.pm25.unwrap_or(0.0);
    let co2 = reading.co2.map(|v| v / 10.0).unwrap_or(0.0);
    let co = reading.co.map(|v| v * 5.0).unwrap_or(0.0);
    pm25.max(co2).max(co).max(0.0)
}

/// US EPA PM2.5 sub-index using the piecewise breakpoints.
pub fn pm25_sub_index(pm25: f64) -> u32 {
    let pm25 = pm25.max(0.0);
    let index = if pm25 <= 12.0 {
        (pm25 / 12.0 * 50.0).floor()
    } else if pm25 <= 35.4 {
        (50.0 + (pm25 - 12.1) / (35.4 - 12.1) * 50.0).floor()
    } else if pm25 <= 55.4 {
        (100.0 + (pm25 - 35.5) / (55.4 - 35.5) * 50.0).floor()
    } else if pm25 <= 150.4 {
        (150.0 + (pm25 - 55.5) / (150.4 - 55.5) * 50.0).floor()
    } else {
        200.0 + ((pm25 - 150.5) / 2.0).floor()
    };
    if index.is_finite() {
        index.max(0.0) as u32
    } else {
        0
    }
}

/// Result of a peak lookup; `NotAvailable` for empty input.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Peak<T> {
    At { timestamp: T, value: f64 },
    NotAvailable,
}

/// Timestamp of the largest value, first occurrence on ties.
///
/// The two sequences are walked in lockstep; unpaired tail entries and NaN
/// values are ignored.
pub fn find_peak<T: Clone>(timestamps: &[T], values: &[f64]) -> Peak<T> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &value) in values.iter().take(timestamps.len()).enumerate() {
        if value.is_nan() {
            continue;
        }
        match best {
            Some((_, max)) if value <= max => {}
            _ => best = Some((i, value)),
        }
    }
    match best {
        Some((i, value)) => Peak::At {
            timestamp: timestamps[i].clone(),
            value,
        },
        None => Peak::NotAvailable,
    }
}

/// Ventilation efficiency in percent: a drop of 100 ppm per minute is 100%.
///
/// Zero for non-positive elapsed time or a non-positive drop.
pub fn ventilation_efficiency(start_co2: f64, end_co2: f64, minutes: f64) -> f64 {
    if minutes.is_nan() || minutes <= 0.0 {
        return 0.0;
    }
    let drop = start_co2 - end_co2;
    if drop.is_nan() || drop <= 0.0 {
        return 0.0;
    }
    let rate = drop / minutes;
    (rate / 100.0 * 100.0).clamp(0.0, 100.0)
}

pub const DEFAULT_HVAC_POWER_KW: f64 = 2.5;
/// Grid average, kg CO2 per kWh.
pub const KG_CO2_PER_KWH: f64 = 0.85;

/// Static estimate of HVAC emissions in kg CO2-equivalent.
pub fn carbon_footprint(hours_running: f64, power_kw: f64) -> f64 {
    let estimate = hours_running.max(0.0) * power_kw.max(0.0) * KG_CO2_PER_KWH;
    if estimate.is_finite() {
        estimate
    } else {
        0.0
    }
}

/// WHO 2021 24-hour PM2.5 guideline, µg/m³.
pub const WHO_PM25_24H: f64 = 15.0;
/// ASHRAE 62.1 indoor CO2 recommendation, ppm.
pub const ASHRAE_CO2: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplianceStatus {
    pub compliant: bool,
    pub issues: Vec<String>,
}

pub fn check_compliance(pm25: f64, co2: f64) -> ComplianceStatus {
    let mut issues = Vec::new();
    if pm25 > WHO_PM25_24H {
        issues.push(format!("PM2.5 exceeds WHO Limit ({}µg/m³)", WHO_PM25_24H));
    }
    if co2 > ASHRAE_CO2 {
        issues.push(format!("CO2 exceeds ASHRAE Limit ({}ppm)", ASHRAE_CO2));
    }
    ComplianceStatus {
        compliant: issues.is_empty(),
        issues,
    }
}
