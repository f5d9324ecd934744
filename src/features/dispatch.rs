//! Connection dispatcher app.
//!
//! Owns the outbound handler table and carries every accepted inbound
//! connection to an outbound handler: the tag the inbound pinned, or the
//! first attached handler when no pin was given.

use std::fmt;
use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;

use crate::config::Declaration;
use crate::features::{Feature, FeatureError};
use crate::instance::Context;
use crate::registry::FeatureKind;

/// Destination an inbound hands to the dispatcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Target {
    pub address: String,
    pub port: u16,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Outbound handler contract: carry one accepted connection to its target.
#[async_trait]
pub trait Outbound: Send + Sync {
    async fn handle(&self, stream: TcpStream, target: &Target) -> io::Result<()>;
}

/// Tag → handler table, with attach order preserved for the default pick.
pub struct Dispatcher {
    outbounds: DashMap<String, Arc<dyn Outbound>>,
    order: Mutex<Vec<String>>,
}

impl Dispatcher {
    fn new() -> Self {
        Self {
            outbounds: DashMap::new(),
            order: Mutex::new(Vec::new()),
        }
    }

    /// Attach an outbound handler under its tag. Outbound constructors call
    /// this during the build phase, before any inbound exists.
    pub fn attach_outbound(&self, tag: &str, handler: Arc<dyn Outbound>) -> Result<(), FeatureError> {
        if self.outbounds.contains_key(tag) {
            return Err(FeatureError::Unavailable(
                "an outbound with this tag is already attached",
            ));
        }
        self.outbounds.insert(tag.to_string(), handler);
        self.order
            .lock()
            .expect("outbound order poisoned")
            .push(tag.to_string());
        Ok(())
    }

    pub fn outbound_count(&self) -> usize {
        self.outbounds.len()
    }

    /// Route one accepted connection to an outbound handler.
    pub async fn dispatch(
        &self,
        stream: TcpStream,
        target: &Target,
        outbound_tag: Option<&str>,
    ) -> io::Result<()> {
        let selected = match outbound_tag {
            Some(tag) => self
                .outbounds
                .get(tag)
                .map(|entry| (tag.to_string(), entry.value().clone())),
            None => {
                let order = self.order.lock().expect("outbound order poisoned");
                order.first().and_then(|tag| {
                    self.outbounds
                        .get(tag)
                        .map(|entry| (tag.clone(), entry.value().clone()))
                })
            }
        };

        let Some((tag, handler)) = selected else {
            metrics::counter!("relay_dispatch_errors_total").increment(1);
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "no outbound handler available",
            ));
        };

        metrics::counter!("relay_connections_total", "outbound" => tag.clone()).increment(1);
        tracing::debug!(outbound = %tag, target = %target, "dispatching connection");

        let result = handler.handle(stream, target).await;
        if result.is_err() {
            metrics::counter!("relay_connection_errors_total", "outbound" => tag).increment(1);
        }
        result
    }
}

/// The `dispatch` app: provides the [`Dispatcher`] into the context.
pub struct DispatchApp {
    dispatcher: Arc<Dispatcher>,
}

impl DispatchApp {
    /// Constructor registered under (app, "dispatch"). Takes no settings.
    pub fn build(
        _declaration: &Declaration,
        context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        let dispatcher = Arc::new(Dispatcher::new());
        context.provide(dispatcher.clone())?;
        Ok(Arc::new(DispatchApp { dispatcher }))
    }
}

#[async_trait]
impl Feature for DispatchApp {
    fn kind(&self) -> FeatureKind {
        FeatureKind::App
    }

    fn type_tag(&self) -> &str {
        "dispatch"
    }

    async fn start(&self) -> Result<(), FeatureError> {
        tracing::debug!(outbounds = self.dispatcher.outbound_count(), "dispatcher ready");
        Ok(())
    }

    async fn stop(&self) -> Result<(), FeatureError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::net::TcpListener;

    struct Counting {
        hits: AtomicUsize,
    }

    #[async_trait]
    impl Outbound for Counting {
        async fn handle(&self, _stream: TcpStream, _target: &Target) -> io::Result<()> {
            self.hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn socket() -> TcpStream {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = tokio::spawn(async move { TcpStream::connect(addr).await });
        let (server, _) = listener.accept().await.unwrap();
        client.await.unwrap().unwrap();
        server
    }

    fn target() -> Target {
        Target {
            address: "127.0.0.1".to_string(),
            port: 80,
        }
    }

    #[tokio::test]
    async fn pinned_tag_wins_over_attach_order() {
        let dispatcher = Dispatcher::new();
        let first = Arc::new(Counting {
            hits: AtomicUsize::new(0),
        });
        let second = Arc::new(Counting {
            hits: AtomicUsize::new(0),
        });
        dispatcher.attach_outbound("first", first.clone()).unwrap();
        dispatcher.attach_outbound("second", second.clone()).unwrap();

        dispatcher
            .dispatch(socket().await, &target(), Some("second"))
            .await
            .unwrap();
        assert_eq!(first.hits.load(Ordering::SeqCst), 0);
        assert_eq!(second.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn default_pick_is_the_first_attached() {
        let dispatcher = Dispatcher::new();
        let first = Arc::new(Counting {
            hits: AtomicUsize::new(0),
        });
        dispatcher.attach_outbound("direct", first.clone()).unwrap();
        dispatcher
            .attach_outbound(
                "sink",
                Arc::new(Counting {
                    hits: AtomicUsize::new(0),
                }),
            )
            .unwrap();

        dispatcher
            .dispatch(socket().await, &target(), None)
            .await
            .unwrap();
        assert_eq!(first.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicate_tag_is_rejected() {
        let dispatcher = Dispatcher::new();
        dispatcher
            .attach_outbound(
                "direct",
                Arc::new(Counting {
                    hits: AtomicUsize::new(0),
                }),
            )
            .unwrap();
        let err = dispatcher.attach_outbound(
            "direct",
            Arc::new(Counting {
                hits: AtomicUsize::new(0),
            }),
        );
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn empty_table_is_a_dispatch_error() {
        let dispatcher = Dispatcher::new();
        let err = dispatcher
            .dispatch(socket().await, &target(), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
