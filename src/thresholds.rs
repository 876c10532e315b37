/// Threshold bands and the classification table
use log::info;
use std::collections::BTreeMap;

use crate::error::DashboardError;
use crate::models::{AirClass, Classification, Metric};

/// CO2 alert line used while exam mode is active.
pub const EXAM_MODE_CO2_THRESHOLD: f64 = 800.0;
/// CO2 alert line restored when exam mode ends.
pub const NORMAL_CO2_THRESHOLD: f64 = 1000.0;

/// Inclusive upper bounds of the `good` and `moderate` tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bands {
    pub good: f64,
    pub moderate: f64,
}

impl Bands {
    pub const fn new(good: f64, moderate: f64) -> Self {
        Bands { good, moderate }
    }

    pub fn class_of(&self, value: f64) -> AirClass {
        if value <= self.good {
            AirClass::Good
        } else if value <= self.moderate {
            AirClass::Moderate
        } else {
            AirClass::Poor
        }
    }
}

/// Reference bands per metric.
pub fn default_bands(metric: Metric) -> Bands {
    match metric {
        Metric::Pm25 => Bands::new(30.0, 37.0),
        Metric::Co2 => Bands::new(400.0, NORMAL_CO2_THRESHOLD),
        Metric::Co => Bands::new(2.0, 9.0),
        Metric::Temperature => Bands::new(35.0, 40.0),
        Metric::Humidity => Bands::new(60.0, 70.0),
        Metric::Aqi => Bands::new(50.0, 100.0),
    }
}

fn label(metric: Metric, class: AirClass) -> &'static str {
    match (metric, class) {
        (Metric::Pm25, AirClass::Good) => "Excellent",
        (Metric::Pm25, AirClass::Moderate) => "Acceptable",
        (Metric::Pm25, AirClass::Poor) => "Unhealthy",
        (Metric::Co2, AirClass::Good) => "Fresh Air",
        (Metric::Co2, AirClass::Moderate) => "Normal",
        (Metric::Co2, AirClass::Poor) => "High",
        (Metric::Co, AirClass::Good) => "Safe",
        (Metric::Co, AirClass::Moderate) => "Caution",
        (Metric::Co, AirClass::Poor) => "Dangerous",
        (Metric::Temperature, AirClass::Good) => "Comfortable",
        (Metric::Temperature, AirClass::Moderate) => "Warm",
        (Metric::Temperature, AirClass::Poor) => "Too Hot",
        (Metric::Humidity, AirClass::Good) => "Comfortable",
        (Metric::Humidity, AirClass::Moderate) => "Slightly Humid",
        (Metric::Humidity, AirClass::Poor) => "Uncomfortable",
        (Metric::Aqi, AirClass::Good) => "Excellent",
        (Metric::Aqi, AirClass::Moderate) => "Acceptable",
        (Metric::Aqi, AirClass::Poor) => "Unhealthy",
    }
}

/// Admin-adjustable band boundaries keyed by metric.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSet {
    bands: BTreeMap<Metric, Bands>,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        let bands = Metric::SENSORS
            .iter()
            .chain(std::iter::once(&Metric::Aqi))
            .map(|&m| (m, default_bands(m)))
            .collect();
        ThresholdSet { bands }
    }
}

impl ThresholdSet {
    pub fn bands(&self, metric: Metric) -> Bands {
        self.bands
            .get(&metric)
            .copied()
            .unwrap_or_else(|| default_bands(metric))
    }

    /// Pure lookup of `value` against the current bands of `metric`.
    pub fn classify(&self, metric: Metric, value: f64) -> Classification {
        let class = self.bands(metric).class_of(value);
        Classification {
            class,
            label: label(metric, class),
        }
    }

    /// Set the alert line (upper bound of `moderate`) for a metric by name.
    ///
    /// The `good` bound is lowered when needed so tiers stay ordered. Takes
    /// effect for the next classification only.
    pub fn set_threshold(&mut self, metric_name: &str, value: f64) -> Result<(), DashboardError> {
        let metric = Metric::parse(metric_name)
            .ok_or_else(|| DashboardError::UnknownMetric(metric_name.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(DashboardError::InvalidThreshold {
                metric: metric.name().to_string(),
                value,
            });
        }

        let current = self.bands(metric);
        let updated = Bands {
            good: current.good.min(value),
            moderate: value,
        };
        self.bands.insert(metric, updated);
        info!("{} threshold updated to {}", metric.name().to_uppercase(), value);
        Ok(())
    }

    /// Stricter CO2 alert line for exam sessions.
    pub fn set_exam_mode(&mut self, enabled: bool) -> Result<(), DashboardError> {
        let value = if enabled {
            EXAM_MODE_CO2_THRESHOLD
        } else {
            NORMAL_CO2_THRESHOLD
        };
        self.set_threshold("co2", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn co2_boundaries_land_on_inclusive_side() {
        let t = ThresholdSet::default();
        assert_eq!(t.classify(Metric::Co2, 400.0).class, AirClass::Good);
        assert_eq!(t.classify(Metric::Co2, 401.0).class, AirClass::Moderate);
        assert_eq!(t.classify(Metric::Co2, 1000.0).class, AirClass::Moderate);
        assert_eq!(t.classify(Metric::Co2, 1001.0).class, AirClass::Poor);
    }

    #[test]
    fn reference_table_for_every_metric() {
        let t = ThresholdSet::default();
        let cases = [
            (Metric::Pm25, 30.0, 37.0),
            (Metric::Co, 2.0, 9.0),
            (Metric::Temperature, 35.0, 40.0),
            (Metric::Humidity, 60.0, 70.0),
            (Metric::Aqi, 50.0, 100.0),
        ];
        for (metric, good, moderate) in cases {
            assert_eq!(t.classify(metric, good).class, AirClass::Good, "{metric}");
            assert_eq!(t.classify(metric, good + 0.1).class, AirClass::Moderate, "{metric}");
            assert_eq!(t.classify(metric, moderate).class, AirClass::Moderate, "{metric}");
            assert_eq!(t.classify(metric, moderate + 0.1).class, AirClass::Poor, "{metric}");
        }
    }

    #[test]
    fn labels_follow_metric_and_class() {
        let t = ThresholdSet::default();
        assert_eq!(t.classify(Metric::Co2, 350.0).label, "Fresh Air");
        assert_eq!(t.classify(Metric::Co, 12.0).label, "Dangerous");
        assert_eq!(t.classify(Metric::Humidity, 65.0).label, "Slightly Humid");
    }

    #[test]
    fn set_threshold_moves_only_the_named_metric() {
        let mut t = ThresholdSet::default();
        t.set_threshold("CO2", 800.0).unwrap();

        assert_eq!(t.classify(Metric::Co2, 801.0).class, AirClass::Poor);
        assert_eq!(t.classify(Metric::Co2, 800.0).class, AirClass::Moderate);
        assert_eq!(t.bands(Metric::Pm25), default_bands(Metric::Pm25));
    }

    #[test]
    fn set_threshold_is_idempotent() {
        let mut once = ThresholdSet::default();
        once.set_threshold("pm25", 35.0).unwrap();
        let mut twice = once.clone();
        twice.set_threshold("pm25", 35.0).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn low_threshold_keeps_tiers_ordered() {
        let mut t = ThresholdSet::default();
        t.set_threshold("co2", 350.0).unwrap();
        assert_eq!(t.bands(Metric::Co2), Bands::new(350.0, 350.0));
        assert_eq!(t.classify(Metric::Co2, 351.0).class, AirClass::Poor);
    }

    #[test]
    fn rejects_unknown_metric_and_bad_values() {
        let mut t = ThresholdSet::default();
        assert!(matches!(
            t.set_threshold("radon", 10.0),
            Err(DashboardError::UnknownMetric(_))
        ));
        assert!(matches!(
            t.set_threshold("co2", f64::NAN),
            Err(DashboardError::InvalidThreshold { .. })
        ));
        assert!(t.set_threshold("co2", -5.0).is_err());
        assert_eq!(t, ThresholdSet::default());
    }

    #[test]
    fn exam_mode_toggles_co2_alert_line() {
        let mut t = ThresholdSet::default();
        t.set_exam_mode(true).unwrap();
        assert_eq!(t.bands(Metric::Co2).moderate, 800.0);
        t.set_exam_mode(false).unwrap();
        assert_eq!(t.bands(Metric::Co2).moderate, 1000.0);
    }
}
