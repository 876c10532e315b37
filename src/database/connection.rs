use log::{error, warn};
use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};
use postgres_openssl::MakeTlsConnector;
use tokio::time::Duration;
use url::Url;

use crate::error::DashboardError;

const MAX_RETRIES: usize = 5;
const WAIT_BETWEEN_RETRIES: u64 = 5;

pub fn create_ssl_connector(sslrootcert_path: &str) -> Result<MakeTlsConnector, DashboardError> {
    let mut builder = SslConnector::builder(SslMethod::tls())
        .map_err(|e| DashboardError::Persistence(format!("SSL builder error: {}", e)))?;

    builder
        .set_ca_file(sslrootcert_path)
        .map_err(|e| DashboardError::Persistence(format!("Error loading CA cert: {}", e)))?;

    builder.set_verify(SslVerifyMode::PEER);

    Ok(MakeTlsConnector::new(builder.build()))
}

/// Split the `sslrootcert` parameter out of a connection string.
///
/// # Returns
/// The connection string without `sslrootcert` and the certificate path
pub fn split_database_url(database_url: &str) -> Result<(String, String), DashboardError> {
    let url = Url::parse(database_url)
        .map_err(|e| DashboardError::Persistence(format!("URL parse error: {}", e)))?;

    let mut sslrootcert_path = None;
    let mut clean_params = Vec::new();
    for (key, value) in url.query_pairs() {
        if key == "sslrootcert" {
            sslrootcert_path = Some(value.to_string());
        } else {
            clean_params.push((key.into_owned(), value.into_owned()));
        }
    }

    let sslrootcert_path = sslrootcert_path
        .ok_or_else(|| DashboardError::Persistence("sslrootcert parameter missing".into()))?;

    let mut clean_url = url.clone();
    clean_url.set_query(None);
    if !clean_params.is_empty() {
        let query = clean_params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        clean_url.set_query(Some(&query));
    }

    Ok((clean_url.to_string(), sslrootcert_path))
}

/// Connect and run `operation`, retrying connection failures.
///
/// A query rejected by the server (constraint violation, bad schema) is
/// returned at once; only connection-level failures are retried.
pub async fn execute_with_retry<F, Fut, T>(database_url: &str, operation: F) -> Result<T, DashboardError>
where
    F: Fn(tokio_postgres::Client) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = Result<T, tokio_postgres::Error>> + Send,
{
    let (clean_database_url, sslrootcert_path) = split_database_url(database_url)?;

    for attempt in 0..MAX_RETRIES {
        let connector = create_ssl_connector(&sslrootcert_path)?;

        match tokio_postgres::connect(&clean_database_url, connector).await {
            Ok((client, connection)) => {
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("Connection error: {}", e);
                    }
                });

                match operation(client).await {
                    Ok(output) => return Ok(output),
                    Err(e) if e.as_db_error().is_some() => {
                        return Err(DashboardError::Persistence(format!("Query error: {}", e)));
                    }
                    Err(e) => warn!("Attempt {}: query error: {}", attempt + 1, e),
                }
            }
            Err(e) => warn!("Attempt {}: connection error: {}", attempt + 1, e),
        }

        if attempt < MAX_RETRIES - 1 {
            tokio::time::sleep(Duration::from_secs(WAIT_BETWEEN_RETRIES)).await;
        }
    }

    Err(DashboardError::Persistence("Max retries exceeded".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sslrootcert_and_keeps_other_params() {
        let (url, cert) = split_database_url(
            "postgres://user:pw@db.local:5432/air?sslrootcert=/etc/ca.pem&sslmode=require",
        )
        .unwrap();
        assert_eq!(cert, "/etc/ca.pem");
        assert_eq!(url, "postgres://user:pw@db.local:5432/air?sslmode=require");
    }

    #[test]
    fn drops_query_when_only_sslrootcert() {
        let (url, _) = split_database_url("postgres://db.local/air?sslrootcert=ca.pem").unwrap();
        assert_eq!(url, "postgres://db.local/air");
    }

    #[test]
    fn rejects_missing_sslrootcert() {
        let err = split_database_url("postgres://db.local/air").unwrap_err();
        assert!(matches!(err, DashboardError::Persistence(_)));
        assert!(split_database_url("not a url").is_err());
    }
}
