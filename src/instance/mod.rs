//! Instance construction and the shared runtime context.
//!
//! # Data Flow
//! ```text
//! Config + FeatureRegistry
//!     → builder.rs (context → apps → outbounds → inbounds)
//!     → Instance (wired, not yet started)
//!     → LifecycleController (start/close)
//! ```

pub mod builder;
pub mod context;

pub use builder::{BuildError, InstanceBuilder};
pub use context::Context;

use std::sync::Arc;

use crate::features::Feature;
use crate::registry::FeatureKind;

/// One constructed feature, in construction order.
pub struct FeatureSlot {
    pub kind: FeatureKind,
    pub type_tag: String,
    pub tag: Option<String>,
    pub feature: Arc<dyn Feature>,
}

impl FeatureSlot {
    /// Label used in logs and shutdown error reports.
    pub fn label(&self) -> String {
        match &self.tag {
            Some(tag) => format!("{} {}/{}", self.kind, self.type_tag, tag),
            None => format!("{} {}", self.kind, self.type_tag),
        }
    }
}

/// A fully wired, not-yet-started composition of features.
///
/// The instance exclusively owns its features; the shared context only
/// hands out non-owning lookups.
pub struct Instance {
    context: Arc<Context>,
    features: Vec<FeatureSlot>,
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field(
                "features",
                &self.features.iter().map(FeatureSlot::label).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Instance {
    pub(crate) fn from_parts(context: Arc<Context>, features: Vec<FeatureSlot>) -> Self {
        Self { context, features }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Features in construction order.
    pub fn features(&self) -> &[FeatureSlot] {
        &self.features
    }
}
