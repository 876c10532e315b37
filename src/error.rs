/// Errors raised at the service boundaries.
///
/// The derived-metrics engine itself never fails; these cover configuration,
/// administrative threshold updates, export and the persistence sink.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("invalid threshold {value} for {metric}")]
    InvalidThreshold { metric: String, value: f64 },

    #[error("export failed: {0}")]
    Export(String),

    #[error("persistence failed: {0}")]
    Persistence(String),
}
