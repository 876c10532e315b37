/// Utility functions for formatting and aggregation
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::{AverageData, Metric, Reading};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// RFC 3339 timestamp, used as the persistence key and in exports.
pub fn iso_timestamp(dt: &OffsetDateTime) -> String {
    dt.format(&Rfc3339).unwrap_or_else(|_| dt.to_string())
}

/// Wall-clock time of day, HH:MM:SS.
pub fn format_clock(dt: &OffsetDateTime) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Calendar date, DD.MM.YYYY.
pub fn format_date(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Calendar date, YYYY-MM-DD, for file names.
pub fn format_file_date(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Round to a fixed number of decimal places.
pub fn round_decimals(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Calculate average values over a set of readings
///
/// Each metric is averaged over the readings that carry it; a metric with no
/// values at all stays `None`. Values are rounded to two decimal places.
pub fn calculate_averages<'a, I>(readings: I) -> AverageData
where
    I: IntoIterator<Item = &'a Reading>,
{
    let mut sums = [0.0f64; 5];
    let mut counts = [0usize; 5];
    let mut samples = 0;

    for reading in readings {
        samples += 1;
        for (i, metric) in Metric::SENSORS.iter().enumerate() {
            if let Some(value) = reading.get(*metric) {
                sums[i] += value;
                counts[i] += 1;
            }
        }
    }

    let mean = |i: usize| {
        if counts[i] == 0 {
            None
        } else {
            Some(round_decimals(sums[i] / counts[i] as f64, 2))
        }
    };

    AverageData {
        pm25: mean(0),
        co2: mean(1),
        co: mean(2),
        temperature: mean(3),
        humidity: mean(4),
        samples,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn formats() {
        let dt = datetime!(2024-03-09 07:05:03 UTC);
        assert_eq!(format_datetime(&dt), "09.03.2024 - 07:05:03");
        assert_eq!(iso_timestamp(&dt), "2024-03-09T07:05:03Z");
        assert_eq!(format_clock(&dt), "07:05:03");
        assert_eq!(format_date(&dt), "09.03.2024");
        assert_eq!(format_file_date(&dt), "2024-03-09");
    }

    #[test]
    fn rounding() {
        assert_eq!(round_decimals(12.345, 1), 12.3);
        assert_eq!(round_decimals(0.0354, 2), 0.04);
        assert_eq!(round_decimals(99.96, 1), 100.0);
    }

    #[test]
    fn averages_skip_absent_values() {
        let base = datetime!(2024-03-09 07:00 UTC);
        let mut a = Reading::empty(base);
        a.co2 = Some(500.0);
        a.pm25 = Some(10.0);
        let mut b = Reading::empty(base);
        b.co2 = Some(700.0);
        let c = Reading::empty(base);

        let averages = calculate_averages([&a, &b, &c]);
        assert_eq!(averages.samples, 3);
        assert_eq!(averages.co2, Some(600.0));
        assert_eq!(averages.pm25, Some(10.0));
        assert_eq!(averages.humidity, None);
    }

    #[test]
    fn averages_of_nothing() {
        let averages = calculate_averages(std::iter::empty());
        assert_eq!(averages, AverageData::default());
    }
}
