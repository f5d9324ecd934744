//! Structured logging.
//!
//! # Design Decisions
//! - tracing for structured logging throughout
//! - Level defaults to `relayd=info`, overridable through `RUST_LOG`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Called once, at process start.
pub fn init() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relayd=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
