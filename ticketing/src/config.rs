//! Configuration management for the box office server.
//!
//! Options come from the command line, falling back to environment variables
//! (a `.env` file is loaded first by the binary), then to defaults.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Default UDP port
pub const DEFAULT_PORT: u16 = 2022;

/// Default reservation lifetime in seconds
pub const DEFAULT_TIMEOUT_SECS: u32 = 5;

/// Longest accepted reservation lifetime in seconds (one day)
pub const MAX_TIMEOUT_SECS: u32 = 86_400;

/// Default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "info,ticketing=debug";

/// Command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(name = "boxoffice-server")]
#[command(version, about = "UDP ticket sales server")]
pub struct Args {
    /// UDP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "BOXOFFICE_PORT")]
    pub port: u16,

    /// Seconds a reservation stays redeemable
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_TIMEOUT_SECS,
        env = "BOXOFFICE_TIMEOUT",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_TIMEOUT_SECS))
    )]
    pub timeout: u32,

    /// Catalog file: alternating description and ticket count lines
    #[arg(short, long, env = "BOXOFFICE_CATALOG")]
    pub file: PathBuf,

    /// Address to bind
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED), env = "BOXOFFICE_HOST")]
    pub bind: IpAddr,

    /// Prometheus listener address; metrics are off when unset
    #[arg(long, env = "BOXOFFICE_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,

    /// Tracing filter directives
    #[arg(long, default_value = DEFAULT_LOG_FILTER, env = "RUST_LOG")]
    pub log: String,
}

/// Validated server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// UDP listen address
    pub listen_addr: SocketAddr,
    /// Reservation lifetime in seconds
    pub timeout_secs: u32,
    /// Catalog file path
    pub catalog_path: PathBuf,
    /// Prometheus listener, if enabled
    pub metrics_addr: Option<SocketAddr>,
    /// Tracing filter directives
    pub log_filter: String,
}

impl Config {
    /// Parse the process arguments and environment
    ///
    /// Exits the process with a usage message on invalid input.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from(Args::parse())
    }

    /// Reservation lifetime
    #[must_use]
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.timeout_secs))
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            listen_addr: SocketAddr::new(args.bind, args.port),
            timeout_secs: args.timeout,
            catalog_path: args.file,
            metrics_addr: args.metrics_addr,
            log_filter: args.log,
        }
    }
}
