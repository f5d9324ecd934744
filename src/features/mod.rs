//! Feature contract and built-in features.
//!
//! A feature is a pluggable capability unit: an app (dispatcher, metrics),
//! an outbound handler, or an inbound handler. Constructors wire a feature
//! into the shared runtime context; `start`/`stop` hooks own its runtime
//! resources.
//!
//! # Design Decisions
//! - Hooks take `&self`; features keep mutable state behind locks so a stop
//!   without a completed start is a safe no-op.
//! - Constructors must not acquire external resources (sockets, timers);
//!   those belong to `start`, which keeps build-failure rollback a plain
//!   reverse-order drop.

pub mod dispatch;
pub mod inbound;
pub mod metrics;
pub mod outbound;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::registry::FeatureKind;

/// Errors surfaced by feature constructors and lifecycle hooks.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The constructor rejected its settings payload.
    #[error("invalid settings: {0}")]
    Settings(#[from] serde_json::Error),

    /// A listen or target address did not parse.
    #[error("invalid address \"{0}\"")]
    Address(String),

    /// A runtime resource could not be acquired or released.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A required collaborator is missing from the runtime context.
    #[error("{0}")]
    Unavailable(&'static str),

    /// Anything else a feature needs to report.
    #[error("{0}")]
    Other(String),
}

/// A constructed capability with start/stop hooks.
#[async_trait]
pub trait Feature: Send + Sync {
    fn kind(&self) -> FeatureKind;

    fn type_tag(&self) -> &str;

    /// Acquire runtime resources. Called exactly once, in construction
    /// order, by the lifecycle controller.
    async fn start(&self) -> Result<(), FeatureError>;

    /// Release runtime resources. Must be safe even if `start` never
    /// completed, and is invoked at most once.
    async fn stop(&self) -> Result<(), FeatureError>;
}

impl std::fmt::Debug for dyn Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feature")
            .field("kind", &self.kind())
            .field("type_tag", &self.type_tag())
            .finish()
    }
}

/// Deserialize a declaration's settings payload.
///
/// An absent payload reads as an empty object, so settings structs with
/// full defaults accept a bare declaration.
pub(crate) fn parse_settings<T: DeserializeOwned>(
    value: &serde_json::Value,
) -> Result<T, FeatureError> {
    let value = match value {
        serde_json::Value::Null => serde_json::Value::Object(serde_json::Map::new()),
        other => other.clone(),
    };
    Ok(serde_json::from_value(value)?)
}
