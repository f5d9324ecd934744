//! Feature catalog.
//!
//! # Data Flow
//! ```text
//! Composition root:
//!     FeatureRegistry::new() → builtin::register_builtin() → frozen
//!
//! Build time:
//!     InstanceBuilder looks up (kind, type tag) → constructor → feature
//! ```
//!
//! # Design Decisions
//! - The registry is an owned value built by the composition root and
//!   passed by reference, never ambient process state; tests construct
//!   isolated registries.
//! - All registration happens before the first lookup, so a plain HashMap
//!   suffices; after setup the registry is only shared immutably.
//! - A duplicate (kind, type tag) is a setup error; the first registration
//!   is retained.

pub mod builtin;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::config::Declaration;
use crate::features::{Feature, FeatureError};
use crate::instance::Context;

/// The three capability kinds a declaration can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    App,
    Outbound,
    Inbound,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::App => "app",
            FeatureKind::Outbound => "outbound",
            FeatureKind::Inbound => "inbound",
        };
        f.write_str(name)
    }
}

/// Constructor contract: the declaration (tag plus opaque settings) and the
/// shared runtime context in, a wired but not-yet-started feature out.
pub type Constructor =
    Box<dyn Fn(&Declaration, &Arc<Context>) -> Result<Arc<dyn Feature>, FeatureError> + Send + Sync>;

/// One catalog entry: a constructor plus a human-readable name for logs.
pub struct RegistryEntry {
    pub name: &'static str,
    constructor: Constructor,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl RegistryEntry {
    pub fn construct(
        &self,
        declaration: &Declaration,
        context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        (self.constructor)(declaration, context)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("{kind} \"{type_tag}\" is already registered")]
    Duplicate { kind: FeatureKind, type_tag: String },

    #[error("no {kind} registered under \"{type_tag}\"")]
    NotFound { kind: FeatureKind, type_tag: String },
}

/// Catalog mapping (kind, type tag) to a feature constructor.
#[derive(Default)]
pub struct FeatureRegistry {
    entries: HashMap<(FeatureKind, String), RegistryEntry>,
}

impl FeatureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor under (kind, type tag).
    ///
    /// A second registration under the same identifier is rejected and the
    /// first entry is retained.
    pub fn register<C>(
        &mut self,
        kind: FeatureKind,
        type_tag: &str,
        name: &'static str,
        constructor: C,
    ) -> Result<(), RegistryError>
    where
        C: Fn(&Declaration, &Arc<Context>) -> Result<Arc<dyn Feature>, FeatureError>
            + Send
            + Sync
            + 'static,
    {
        match self.entries.entry((kind, type_tag.to_string())) {
            Entry::Occupied(_) => Err(RegistryError::Duplicate {
                kind,
                type_tag: type_tag.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(RegistryEntry {
                    name,
                    constructor: Box::new(constructor),
                });
                Ok(())
            }
        }
    }

    pub fn lookup(&self, kind: FeatureKind, type_tag: &str) -> Result<&RegistryEntry, RegistryError> {
        self.entries
            .get(&(kind, type_tag.to_string()))
            .ok_or_else(|| RegistryError::NotFound {
                kind,
                type_tag: type_tag.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Null;

    #[async_trait]
    impl Feature for Null {
        fn kind(&self) -> FeatureKind {
            FeatureKind::App
        }

        fn type_tag(&self) -> &str {
            "null"
        }

        async fn start(&self) -> Result<(), FeatureError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), FeatureError> {
            Ok(())
        }
    }

    fn null_ctor(
        _declaration: &Declaration,
        _context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        Ok(Arc::new(Null))
    }

    #[test]
    fn duplicate_registration_is_rejected_and_first_retained() {
        let mut registry = FeatureRegistry::new();
        registry
            .register(FeatureKind::App, "null", "first", null_ctor)
            .unwrap();

        let err = registry
            .register(FeatureKind::App, "null", "second", null_ctor)
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate { .. }));

        let entry = registry.lookup(FeatureKind::App, "null").unwrap();
        assert_eq!(entry.name, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lookup_miss_names_the_capability() {
        let registry = FeatureRegistry::new();
        let err = registry.lookup(FeatureKind::Inbound, "socks").unwrap_err();
        match err {
            RegistryError::NotFound { kind, type_tag } => {
                assert_eq!(kind, FeatureKind::Inbound);
                assert_eq!(type_tag, "socks");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn same_type_tag_under_different_kinds() {
        let mut registry = FeatureRegistry::new();
        registry
            .register(FeatureKind::Outbound, "direct", "outbound", null_ctor)
            .unwrap();
        registry
            .register(FeatureKind::Inbound, "direct", "inbound", null_ctor)
            .unwrap();

        assert!(registry.lookup(FeatureKind::Outbound, "direct").is_ok());
        assert!(registry.lookup(FeatureKind::Inbound, "direct").is_ok());
    }
}
