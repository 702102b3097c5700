//! Prometheus metrics for the store runtime.
//!
//! Runtime-level metrics cover the datagram loop itself:
//! - Datagrams received (and empty datagrams skipped)
//! - Replies sent and bytes written
//! - Reducer execution time
//!
//! Recording is a no-op until a recorder is installed, so the server only pays
//! for metrics when [`MetricsServer::start`] was called.
//!
//! # Example
//!
//! ```rust,no_run
//! use boxoffice_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

// Re-export metrics macros for use in other crates
pub use metrics::{counter, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping. Must be
/// started from within a tokio runtime.
#[derive(Debug)]
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started: false,
        }
    }

    /// Register metric descriptions and start the HTTP exporter.
    ///
    /// # Errors
    ///
    /// Returns error if the exporter cannot be built or installed (for
    /// example when another recorder is already installed).
    pub fn start(&mut self) -> Result<(), MetricsError> {
        if self.started {
            return Ok(());
        }

        PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;

        register_metrics();
        self.started = true;

        tracing::info!(
            addr = %self.addr,
            "Metrics server started - available at http://{}/metrics",
            self.addr
        );
        Ok(())
    }

    /// Address the exporter listens on.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Register descriptions for all runtime metrics.
pub fn register_metrics() {
    describe_counter!(
        "boxoffice_datagrams_received_total",
        "Total datagrams received by the serve loop"
    );
    describe_counter!(
        "boxoffice_empty_datagrams_total",
        "Zero-length datagrams skipped by the serve loop"
    );
    describe_counter!(
        "boxoffice_replies_sent_total",
        "Total reply datagrams sent"
    );
    describe_counter!(
        "boxoffice_reply_bytes_total",
        "Total bytes sent in reply datagrams"
    );
    describe_histogram!(
        "boxoffice_store_reduce_duration_seconds",
        "Time spent inside the reducer per action"
    );
}

/// Record one received datagram.
pub fn record_datagram_received(len: usize) {
    counter!("boxoffice_datagrams_received_total").increment(1);
    if len == 0 {
        counter!("boxoffice_empty_datagrams_total").increment(1);
    }
}

/// Record one reply sent.
pub fn record_reply_sent(len: usize) {
    counter!("boxoffice_replies_sent_total").increment(1);
    counter!("boxoffice_reply_bytes_total").increment(len as u64);
}

/// Record how long a reduce call took.
pub fn record_reduce_duration(elapsed: Duration) {
    histogram!("boxoffice_store_reduce_duration_seconds").record(elapsed.as_secs_f64());
}
