//! Built-in feature catalog.
//!
//! The composition root calls [`register_builtin`] once, before any
//! configuration is resolved. The explicit list keeps registration order
//! deterministic and inspectable; there is no hidden cross-module
//! initialization.

use crate::features::dispatch::DispatchApp;
use crate::features::inbound::tcp::TcpInbound;
use crate::features::metrics::MetricsApp;
use crate::features::outbound::blackhole::BlackholeOutbound;
use crate::features::outbound::freedom::FreedomOutbound;
use crate::registry::{FeatureKind, FeatureRegistry, RegistryError};

/// Register every built-in feature.
pub fn register_builtin(registry: &mut FeatureRegistry) -> Result<(), RegistryError> {
    // Apps.
    registry.register(
        FeatureKind::App,
        "dispatch",
        "connection dispatcher",
        DispatchApp::build,
    )?;
    registry.register(
        FeatureKind::App,
        "metrics",
        "prometheus exporter",
        MetricsApp::build,
    )?;

    // Outbound handlers.
    registry.register(
        FeatureKind::Outbound,
        "freedom",
        "direct connect",
        FreedomOutbound::build,
    )?;
    registry.register(
        FeatureKind::Outbound,
        "blackhole",
        "connection sink",
        BlackholeOutbound::build,
    )?;

    // Inbound handlers.
    registry.register(
        FeatureKind::Inbound,
        "tcp",
        "fixed-destination forwarder",
        TcpInbound::build,
    )?;

    Ok(())
}
