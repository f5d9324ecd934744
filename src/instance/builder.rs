//! Instance construction.
//!
//! # Responsibilities
//! - Resolve every declaration against the feature registry
//! - Construct features in dependency order: context, apps, outbounds,
//!   inbounds last
//! - Release everything built so far when any constructor fails
//!
//! # Design Decisions
//! - Inbounds come last so routing and outbound capacity exist before any
//!   listener could accept traffic
//! - A registry miss is a diagnosable error naming the capability, never a
//!   silent skip

use std::sync::Arc;

use thiserror::Error;

use crate::config::{Config, Declaration};
use crate::features::FeatureError;
use crate::instance::{Context, FeatureSlot, Instance};
use crate::registry::{FeatureKind, FeatureRegistry};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("configuration names an unregistered {kind} \"{type_tag}\"")]
    Unregistered { kind: FeatureKind, type_tag: String },

    #[error("failed to construct {kind} \"{type_tag}\"")]
    Construction {
        kind: FeatureKind,
        type_tag: String,
        #[source]
        source: FeatureError,
    },
}

/// Resolves a configuration into a wired [`Instance`].
pub struct InstanceBuilder<'r> {
    registry: &'r FeatureRegistry,
}

impl<'r> InstanceBuilder<'r> {
    pub fn new(registry: &'r FeatureRegistry) -> Self {
        Self { registry }
    }

    /// Construct every declared feature, strictly ordered.
    ///
    /// On failure, every feature already constructed in this attempt is
    /// released in reverse order before the error propagates; no partially
    /// built instance ever escapes.
    pub fn build(&self, config: &Config) -> Result<Instance, BuildError> {
        let context = Context::new();
        let mut features: Vec<FeatureSlot> = Vec::new();

        let sections = [
            (FeatureKind::App, &config.apps),
            (FeatureKind::Outbound, &config.outbounds),
            (FeatureKind::Inbound, &config.inbounds),
        ];

        for (kind, declarations) in sections {
            for declaration in declarations {
                match self.construct(kind, declaration, &context) {
                    Ok(slot) => features.push(slot),
                    Err(err) => {
                        release(&mut features);
                        return Err(err);
                    }
                }
            }
        }

        tracing::debug!(features = features.len(), "instance wired");
        Ok(Instance::from_parts(context, features))
    }

    fn construct(
        &self,
        kind: FeatureKind,
        declaration: &Declaration,
        context: &Arc<Context>,
    ) -> Result<FeatureSlot, BuildError> {
        let entry = self
            .registry
            .lookup(kind, &declaration.type_tag)
            .map_err(|_| BuildError::Unregistered {
                kind,
                type_tag: declaration.type_tag.clone(),
            })?;

        let feature = entry
            .construct(declaration, context)
            .map_err(|source| BuildError::Construction {
                kind,
                type_tag: declaration.type_tag.clone(),
                source,
            })?;

        tracing::debug!(
            kind = %kind,
            type_tag = %declaration.type_tag,
            name = entry.name,
            "feature constructed"
        );

        Ok(FeatureSlot {
            kind,
            type_tag: declaration.type_tag.clone(),
            tag: declaration.tag.clone(),
            feature,
        })
    }
}

/// Reverse-order release of a failed build attempt.
fn release(features: &mut Vec<FeatureSlot>) {
    while let Some(slot) = features.pop() {
        tracing::debug!(feature = %slot.label(), "releasing after failed build");
        drop(slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::features::Feature;

    #[derive(Default)]
    struct Tally {
        built: AtomicUsize,
        dropped: AtomicUsize,
    }

    struct CountedFeature {
        kind: FeatureKind,
        tally: Arc<Tally>,
    }

    impl Drop for CountedFeature {
        fn drop(&mut self) {
            self.tally.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Feature for CountedFeature {
        fn kind(&self) -> FeatureKind {
            self.kind
        }

        fn type_tag(&self) -> &str {
            "counted"
        }

        async fn start(&self) -> Result<(), FeatureError> {
            Ok(())
        }

        async fn stop(&self) -> Result<(), FeatureError> {
            Ok(())
        }
    }

    fn registry_with(tally: &Arc<Tally>) -> FeatureRegistry {
        let mut registry = FeatureRegistry::new();
        for kind in [FeatureKind::App, FeatureKind::Outbound, FeatureKind::Inbound] {
            let tally = tally.clone();
            registry
                .register(kind, "counted", "counted", move |_, _| {
                    tally.built.fetch_add(1, Ordering::SeqCst);
                    Ok(Arc::new(CountedFeature {
                        kind,
                        tally: tally.clone(),
                    }) as Arc<dyn Feature>)
                })
                .unwrap();
        }
        registry
            .register(FeatureKind::Inbound, "broken", "broken", |_, _| {
                Err(FeatureError::Unavailable("constructor always fails"))
            })
            .unwrap();
        registry
    }

    fn declaration(type_tag: &str) -> Declaration {
        Declaration {
            type_tag: type_tag.to_string(),
            tag: None,
            settings: serde_json::Value::Null,
        }
    }

    #[test]
    fn feature_set_matches_declarations_in_order() {
        let tally = Arc::new(Tally::default());
        let registry = registry_with(&tally);

        let config = Config {
            apps: vec![declaration("counted")],
            outbounds: vec![declaration("counted"), declaration("counted")],
            inbounds: vec![declaration("counted")],
        };

        let instance = InstanceBuilder::new(&registry).build(&config).unwrap();
        let kinds: Vec<FeatureKind> = instance.features().iter().map(|slot| slot.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FeatureKind::App,
                FeatureKind::Outbound,
                FeatureKind::Outbound,
                FeatureKind::Inbound
            ]
        );
        assert_eq!(tally.built.load(Ordering::SeqCst), 4);
        assert_eq!(tally.dropped.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unregistered_feature_is_diagnosed() {
        let tally = Arc::new(Tally::default());
        let registry = registry_with(&tally);

        let config = Config {
            apps: vec![declaration("counted")],
            inbounds: vec![declaration("socks")],
            ..Config::default()
        };

        let err = InstanceBuilder::new(&registry).build(&config).unwrap_err();
        match err {
            BuildError::Unregistered { kind, type_tag } => {
                assert_eq!(kind, FeatureKind::Inbound);
                assert_eq!(type_tag, "socks");
            }
            other => panic!("unexpected error: {other}"),
        }
        // The app constructed before the miss was released.
        assert_eq!(tally.built.load(Ordering::SeqCst), 1);
        assert_eq!(tally.dropped.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn construction_failure_releases_everything_built() {
        let tally = Arc::new(Tally::default());
        let registry = registry_with(&tally);

        let config = Config {
            apps: vec![declaration("counted")],
            outbounds: vec![declaration("counted")],
            inbounds: vec![declaration("broken")],
        };

        let err = InstanceBuilder::new(&registry).build(&config).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Construction {
                kind: FeatureKind::Inbound,
                ..
            }
        ));
        assert_eq!(tally.built.load(Ordering::SeqCst), 2);
        assert_eq!(tally.dropped.load(Ordering::SeqCst), 2);
    }
}
