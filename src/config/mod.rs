//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON/TOML)
//!     → loader.rs (format registry, parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → Config (validated, immutable)
//!     → InstanceBuilder
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Per-feature settings stay opaque until the matching constructor runs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{builtin_formats, format_for_path, ConfigError, FormatRegistry};
pub use schema::{Config, Declaration};
pub use validation::ValidationError;
