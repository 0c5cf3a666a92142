pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod pipeline;
pub mod processor;
pub mod storage;
pub mod training;

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber; `RUST_LOG` overrides the default `info` level
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
