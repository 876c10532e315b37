/// Database operations for storing and reading back air-quality readings
use time::OffsetDateTime;
use tokio_postgres::Row;

use crate::database::connection::execute_with_retry;
use crate::error::DashboardError;
use crate::models::Reading;
use crate::utils::{format_date, iso_timestamp};

const CREATE_READINGS_TABLE: &str = "CREATE TABLE IF NOT EXISTS readings (
    ts_key text PRIMARY KEY,
    recorded_at timestamptz NOT NULL,
    date text NOT NULL,
    pm25 double precision,
    co2 double precision,
    co double precision,
    temperature double precision,
    humidity double precision
)";

/// Create the readings table if it does not exist yet
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
pub async fn ensure_schema(database_url: &str) -> Result<(), DashboardError> {
    execute_with_retry(database_url, |client| async move {
        client.execute(CREATE_READINGS_TABLE, &[]).await
    })
    .await
    .map(|_| ())
}

/// Store a single reading keyed by its timestamp
///
/// A reading whose timestamp is already stored is rejected by the primary key
/// and reported as a persistence error.
///
/// # Arguments
/// * `reading` - Reading to store
/// * `database_url` - PostgreSQL connection string
pub async fn store_reading(reading: &Reading, database_url: &str) -> Result<(), DashboardError> {
    // Clone data for move into async closure
    let reading = reading.clone();
    let ts_key = iso_timestamp(&reading.timestamp);
    let date = format_date(&reading.timestamp);

    execute_with_retry(database_url, move |client| {
        let reading = reading.clone();
        let ts_key = ts_key.clone();
        let date = date.clone();
        async move {
            client
                .execute(
                    "INSERT INTO readings(ts_key, recorded_at, date, pm25, co2, co, temperature, humidity)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                    &[
                        &ts_key,
                        &reading.timestamp,
                        &date,
                        &reading.pm25,
                        &reading.co2,
                        &reading.co,
                        &reading.temperature,
                        &reading.humidity,
                    ],
                )
                .await
        }
    })
    .await
    .map(|_| ())
}

/// Fetch stored readings recorded at or after `since`
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
/// * `since` - Oldest timestamp to include
///
/// # Returns
/// Readings in chronological order
pub async fn fetch_readings(
    database_url: &str,
    since: OffsetDateTime,
) -> Result<Vec<Reading>, DashboardError> {
    execute_with_retry(database_url, move |client| async move {
        client
            .query(
                "SELECT recorded_at, pm25, co2, co, temperature, humidity
                 FROM readings
                 WHERE recorded_at >= $1
                 ORDER BY recorded_at",
                &[&since],
            )
            .await
            .and_then(|rows| rows.iter().map(reading_from_row).collect::<Result<Vec<_>, _>>())
    })
    .await
}

fn reading_from_row(row: &Row) -> Result<Reading, tokio_postgres::Error> {
    Ok(reading_from_columns(
        row.try_get("recorded_at")?,
        [
            row.try_get("pm25")?,
            row.try_get("co2")?,
            row.try_get("co")?,
            row.try_get("temperature")?,
            row.try_get("humidity")?,
        ],
    ))
}

/// Columns in `pm25, co2, co, temperature, humidity` order. A stored NaN or
/// infinity comes back absent, as the normalizer would have produced it.
fn reading_from_columns(recorded_at: OffsetDateTime, values: [Option<f64>; 5]) -> Reading {
    let [pm25, co2, co, temperature, humidity] = values.map(|v| v.filter(|n| n.is_finite()));
    Reading {
        timestamp: recorded_at,
        pm25,
        co2,
        co,
        temperature,
        humidity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn columns_map_to_reading_fields() {
        let at = datetime!(2024-05-02 08:15:00 UTC);
        let reading = reading_from_columns(at, [Some(12.5), Some(640.0), None, Some(22.4), Some(41.0)]);

        assert_eq!(reading.timestamp, at);
        assert_eq!(reading.pm25, Some(12.5));
        assert_eq!(reading.co2, Some(640.0));
        assert_eq!(reading.co, None);
        assert_eq!(reading.temperature, Some(22.4));
        assert_eq!(reading.humidity, Some(41.0));
    }

    #[test]
    fn non_finite_columns_come_back_absent() {
        let at = datetime!(2024-05-02 08:16:00 UTC);
        let reading = reading_from_columns(
            at,
            [Some(f64::NAN), Some(f64::INFINITY), Some(0.0), None, Some(-3.0)],
        );

        assert_eq!(reading.pm25, None);
        assert_eq!(reading.co2, None);
        assert_eq!(reading.co, Some(0.0));
        assert_eq!(reading.temperature, None);
        assert_eq!(reading.humidity, Some(-3.0));
    }
}
