//! Box office server
//!
//! Loads the event catalog and serves the ticket protocol over UDP until
//! Ctrl+C (or SIGTERM), or until the socket fails.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server -- --file events.txt --port 2022 --timeout 5
//! ```

use boxoffice_core::environment::SystemClock;
use boxoffice_runtime::{metrics::MetricsServer, transport::UdpTransport};
use std::sync::Arc;
use ticketing::{
    BoxOfficeEnvironment, Catalog, Config, Ledger, RandomCookieGenerator, new_store, serve,
    shutdown_signal,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| ticketing::config::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        listen = %config.listen_addr,
        timeout_secs = config.timeout_secs,
        catalog = %config.catalog_path.display(),
        "Configuration loaded"
    );

    if let Some(addr) = config.metrics_addr {
        let mut metrics = MetricsServer::new(addr);
        metrics.start()?;
        ticketing::metrics::register_business_metrics();
    }

    let catalog = Catalog::load(&config.catalog_path)?;
    tracing::info!(events = catalog.len(), "Catalog loaded");

    let ledger = Ledger::new(catalog, config.expiry());
    let environment = BoxOfficeEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(RandomCookieGenerator::new()),
    );
    let store = new_store(ledger, environment);

    let transport = UdpTransport::bind(config.listen_addr).await?;
    tracing::info!(addr = %transport.local_addr()?, "Listening for datagrams");

    serve(&store, &transport, shutdown_signal()).await?;

    tracing::info!("Shut down");
    Ok(())
}
