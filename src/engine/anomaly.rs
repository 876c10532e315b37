//! Step-to-step anomaly checks and stagnation (tamper) tracking.

use serde::Serialize;

use crate::models::Reading;

pub const CO2_SPIKE: &str = "Sudden CO2 Spike";
pub const PM25_SPIKE: &str = "Sudden PM2.5 Spike";
pub const CO2_SENSOR_ERROR: &str = "CO2 Sensor Error (0 ppm)";

/// Compare a reading with the one before it.
///
/// Without a previous reading nothing is flagged. A check is skipped when a
/// value it needs is absent.
pub fn detect_anomalies(current: &Reading, previous: Option<&Reading>) -> Vec<&'static str> {
    let mut anomalies = Vec::new();
    let Some(previous) = previous else {
        return anomalies;
    };

    if let (Some(now), Some(before)) = (current.co2, previous.co2) {
        if now > before * 1.2 && now > 600.0 {
            anomalies.push(CO2_SPIKE);
        }
    }
    if let (Some(now), Some(before)) = (current.pm25, previous.pm25) {
        if now > before * 1.5 && now > 20.0 {
            anomalies.push(PM25_SPIKE);
        }
    }
    if current.co2.is_some_and(|co2| co2 <= 0.0) {
        anomalies.push(CO2_SENSOR_ERROR);
    }

    anomalies
}

/// Consecutive identical readings needed before the sensor counts as frozen.
pub const STAGNATION_LIMIT: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TamperStatus {
    Clear,
    Disconnected,
    Frozen { repeats: u32 },
}

impl TamperStatus {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            TamperStatus::Clear => None,
            TamperStatus::Disconnected => Some("CRITICAL: Sensor Disconnected or Reading Zero!"),
            TamperStatus::Frozen { .. } => {
                Some("WARNING: Sensor values unchanged for 10+ mins. Check connection.")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fingerprint {
    co2: Option<f64>,
    pm25: Option<f64>,
}

impl Fingerprint {
    fn of(reading: &Reading) -> Self {
        Fingerprint {
            co2: reading.co2,
            pm25: reading.pm25,
        }
    }

    fn identical(&self, other: &Fingerprint) -> bool {
        same_bits(self.co2, other.co2) && same_bits(self.pm25, other.pm25)
    }
}

fn same_bits(a: Option<f64>, b: Option<f64>) -> bool {
    a.map(f64::to_bits) == b.map(f64::to_bits)
}

/// Stagnation state carried across readings.
#[derive(Debug, Clone, Default)]
pub struct TamperTracker {
    last: Option<Fingerprint>,
    stagnant_count: u32,
}

impl TamperTracker {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn stagnant_count(&self) -> u32 {
        self.stagnant_count
    }

    /// Feed one reading and report tampering.
    ///
    /// A drop from above 450 ppm to exactly zero keeps the prior reading as
    /// the reference, so a sensor that stays at zero keeps reporting. Once
    /// the stagnation limit is passed, every further identical reading
    /// reports `Frozen`.
    pub fn check(&mut self, reading: &Reading) -> TamperStatus {
        let current = Fingerprint::of(reading);
        let Some(last) = self.last else {
            self.last = Some(current);
            return TamperStatus::Clear;
        };

        if last.co2.is_some_and(|co2| co2 > 450.0) && current.co2 == Some(0.0) {
            return TamperStatus::Disconnected;
        }

        if current.identical(&last) {
            self.stagnant_count = self.stagnant_count.saturating_add(1);
            if self.stagnant_count > STAGNATION_LIMIT {
                return TamperStatus::Frozen {
                    repeats: self.stagnant_count,
                };
            }
        } else {
            self.stagnant_count = 0;
        }

        self.last = Some(current);
        TamperStatus::Clear
    }
}
