//! Fixed-destination TCP inbound.
//!
//! Accepts connections on `listen` and forwards each one to `target`
//! through the dispatcher, optionally pinned to a named outbound.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::Declaration;
use crate::features::dispatch::{Dispatcher, Target};
use crate::features::{parse_settings, Feature, FeatureError};
use crate::instance::Context;
use crate::lifecycle::ShutdownSignal;
use crate::net::BoundedListener;
use crate::registry::FeatureKind;

fn default_max_connections() -> usize {
    1024
}

#[derive(Debug, Deserialize)]
struct TcpInboundSettings {
    /// Address to accept connections on.
    listen: String,

    /// Destination every connection is forwarded to.
    target: Target,

    /// Pin dispatch to this outbound tag (default: first attached).
    #[serde(default)]
    outbound: Option<String>,

    /// Concurrent connection limit.
    #[serde(default = "default_max_connections")]
    max_connections: usize,
}

pub struct TcpInbound {
    settings: TcpInboundSettings,
    dispatcher: Arc<Dispatcher>,
    shutdown: ShutdownSignal,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TcpInbound {
    /// Constructor registered under (inbound, "tcp").
    ///
    /// Resolves the dispatcher here rather than at start so a missing
    /// dispatch app is a construction error, before any listener binds.
    pub fn build(
        declaration: &Declaration,
        context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        let settings: TcpInboundSettings = parse_settings(&declaration.settings)?;
        let dispatcher = context.get::<Dispatcher>().ok_or(FeatureError::Unavailable(
            "the dispatch app must be declared before inbound handlers",
        ))?;

        Ok(Arc::new(TcpInbound {
            settings,
            dispatcher,
            shutdown: ShutdownSignal::new(),
            worker: Mutex::new(None),
        }))
    }
}

#[async_trait]
impl Feature for TcpInbound {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Inbound
    }

    fn type_tag(&self) -> &str {
        "tcp"
    }

    async fn start(&self) -> Result<(), FeatureError> {
        let listener =
            BoundedListener::bind(&self.settings.listen, self.settings.max_connections).await?;
        let dispatcher = self.dispatcher.clone();
        let target = self.settings.target.clone();
        let outbound = self.settings.outbound.clone();
        let mut shutdown = self.shutdown.subscribe();

        let handle = tokio::spawn(async move {
            // Relay tasks stay owned by the accept loop so stop tears down
            // in-flight connections along with the listener.
            let mut relays = JoinSet::new();
            loop {
                tokio::select! {
                    _ = shutdown.recv() => break,
                    Some(_) = relays.join_next(), if !relays.is_empty() => {}
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer, permit)) => {
                            let dispatcher = dispatcher.clone();
                            let target = target.clone();
                            let outbound = outbound.clone();
                            relays.spawn(async move {
                                if let Err(err) = dispatcher
                                    .dispatch(stream, &target, outbound.as_deref())
                                    .await
                                {
                                    tracing::debug!(peer = %peer, error = %err, "connection failed");
                                }
                                drop(permit);
                            });
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "accept failed");
                        }
                    },
                }
            }
            drop(listener);
            relays.shutdown().await;
            tracing::debug!("accept loop stopped");
        });

        *self.worker.lock().await = Some(handle);
        Ok(())
    }

    async fn stop(&self) -> Result<(), FeatureError> {
        self.shutdown.trigger();
        // None means start never completed; nothing to wait for.
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "accept loop join failed");
            }
        }
        Ok(())
    }
}
