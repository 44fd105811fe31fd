pub mod api;
pub mod browse;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod render;
pub mod services;
pub mod session;
pub mod types;
pub mod upload;

use tracing_subscriber::EnvFilter;

/// Log to stderr so command output on stdout stays clean. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .with_writer(std::io::stderr)
        .try_init();
}
