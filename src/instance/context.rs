//! Shared runtime context.
//!
//! A typed service map features use to find each other (an inbound locating
//! the dispatcher, outbounds attaching themselves to it). Lookups hand out
//! non-owning `Arc` clones; the instance keeps exclusive ownership of the
//! features themselves.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

use crate::features::FeatureError;

#[derive(Default)]
pub struct Context {
    services: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Context {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Publish a service for cross-feature lookup.
    ///
    /// At most one service per type; a second provision is a construction
    /// error.
    pub fn provide<T: Any + Send + Sync>(&self, service: Arc<T>) -> Result<(), FeatureError> {
        use dashmap::mapref::entry::Entry;
        match self.services.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => Err(FeatureError::Unavailable(
                "a service of this type is already provided",
            )),
            Entry::Vacant(slot) => {
                slot.insert(service);
                Ok(())
            }
        }
    }

    /// Look up a service by type.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|service| Arc::clone(service.value()).downcast::<T>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker(u32);

    #[test]
    fn provide_then_get() {
        let context = Context::new();
        context.provide(Arc::new(Marker(7))).unwrap();

        let marker = context.get::<Marker>().unwrap();
        assert_eq!(marker.0, 7);
    }

    #[test]
    fn missing_service_is_none() {
        let context = Context::new();
        assert!(context.get::<Marker>().is_none());
    }

    #[test]
    fn double_provision_is_rejected() {
        let context = Context::new();
        context.provide(Arc::new(Marker(1))).unwrap();
        assert!(context.provide(Arc::new(Marker(2))).is_err());
        assert_eq!(context.get::<Marker>().unwrap().0, 1);
    }
}
