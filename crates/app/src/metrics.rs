//! Prometheus exporter setup.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use tracing::info;

use crate::config::MetricsConfig;

/// Histogram buckets in seconds, sized for row-locked booking queries.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0];

#[derive(Debug, thiserror::Error)]
pub enum MetricsInitError {
    #[error("Invalid metrics listen address: {0}")]
    InvalidAddress(String),

    #[error("Failed to install Prometheus exporter: {0}")]
    Build(#[from] BuildError),
}

/// Installs the global metrics recorder and serves `/metrics` on `listen_addr`.
///
/// Must run inside a Tokio runtime. Does nothing when metrics are disabled;
/// every `counter!`/`histogram!` call is then a no-op.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsInitError> {
    if !config.enabled {
        return Ok(());
    }

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .map_err(|_| MetricsInitError::InvalidAddress(config.listen_addr.clone()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets(DURATION_BUCKETS)?
        .install()?;

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
