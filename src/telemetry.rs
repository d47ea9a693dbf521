//! Telemetry logic.
//! Logging only; traces and metrics belong to the embedding application.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global `tracing` subscriber reading `RUST_LOG`.
///
/// Falls back to `info` when the variable is absent or malformed.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(fmt::layer())
        .init();
}
