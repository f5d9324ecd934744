//! relayd: a modular proxy runtime.
//!
//! # Architecture Overview
//!
//! ```text
//! register_builtin ──▶ FeatureRegistry
//!                           │
//! config file ──▶ FormatRegistry::load ──▶ Config
//!                           │                 │
//!                           ▼                 ▼
//!                      InstanceBuilder::build ──▶ Instance
//!                                                    │
//!                      LifecycleController::start ◀──┘
//!                           │
//!                      wait_for_shutdown
//!                           │
//!                      LifecycleController::close ──▶ exit
//! ```
//!
//! Features (apps, outbound handlers, inbound handlers) are self-contained
//! capability units selected by configuration. Construction and start run
//! in a fixed order (context, apps, outbounds, inbounds) and shutdown runs
//! in exact reverse, so routing capacity always exists while a listener
//! accepts traffic.

// Core subsystems
pub mod config;
pub mod features;
pub mod instance;
pub mod registry;

// Cross-cutting concerns
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::{Config, ConfigError};
pub use instance::{BuildError, Instance, InstanceBuilder};
pub use lifecycle::{LifecycleController, LifecycleError, LifecycleState};
pub use registry::{FeatureKind, FeatureRegistry};
