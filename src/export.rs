/// CSV export of the reading history
use std::borrow::Borrow;
use time::OffsetDateTime;

use crate::error::DashboardError;
use crate::models::Reading;
use crate::utils::{format_clock, format_date, format_file_date, iso_timestamp};

const RECENT_HEADER: [&str; 5] = ["Time", "PM2.5", "CO2", "Temperature", "Humidity"];
const FULL_HEADER: [&str; 7] = ["Timestamp", "Date", "PM2.5", "CO2", "CO", "Temp", "Humidity"];

/// File name prefix of the short export.
pub const RECENT_EXPORT_PREFIX: &str = "Data";
/// File name prefix of the full-history export.
pub const FULL_EXPORT_PREFIX: &str = "Full_History";

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows<const N: usize, I>(
    header: [&str; N],
    readings: I,
    row: impl Fn(&Reading) -> [String; N],
) -> Result<String, DashboardError>
where
    I: IntoIterator,
    I::Item: Borrow<Reading>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    for reading in readings {
        writer
            .write_record(row(reading.borrow()))
            .map_err(|e| DashboardError::Export(e.to_string()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::Export(e.to_string()))
}

/// Short export: time of day plus the four headline metrics.
pub fn export_recent_csv<I>(readings: I) -> Result<String, DashboardError>
where
    I: IntoIterator,
    I::Item: Borrow<Reading>,
{
    write_rows(RECENT_HEADER, readings, |r| {
        [
            format_clock(&r.timestamp),
            cell(r.pm25),
            cell(r.co2),
            cell(r.temperature),
            cell(r.humidity),
        ]
    })
}

/// Full export with every stored field.
pub fn export_full_csv<I>(readings: I) -> Result<String, DashboardError>
where
    I: IntoIterator,
    I::Item: Borrow<Reading>,
{
    write_rows(FULL_HEADER, readings, |r| {
        [
            iso_timestamp(&r.timestamp),
            format_date(&r.timestamp),
            cell(r.pm25),
            cell(r.co2),
            cell(r.co),
            cell(r.temperature),
            cell(r.humidity),
        ]
    })
}

pub fn export_file_name(prefix: &str, now: &OffsetDateTime) -> String {
    format!("AeroSense_{}_{}.csv", prefix, format_file_date(now))
}
