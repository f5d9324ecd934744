//! Prometheus metrics exporter app.
//!
//! # Metrics
//! - `relay_connections_total` (counter): dispatched connections by outbound
//! - `relay_connection_errors_total` (counter): failed relays by outbound
//! - `relay_dispatch_errors_total` (counter): connections with no handler

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::Declaration;
use crate::features::{parse_settings, Feature, FeatureError};
use crate::instance::Context;
use crate::lifecycle::ShutdownSignal;
use crate::registry::FeatureKind;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MetricsSettings {
    /// Address the exporter's HTTP endpoint listens on.
    listen: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:9100".to_string(),
        }
    }
}

/// The `metrics` app: exposes a Prometheus scrape endpoint.
pub struct MetricsApp {
    listen: SocketAddr,
    shutdown: ShutdownSignal,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsApp {
    /// Constructor registered under (app, "metrics").
    pub fn build(
        declaration: &Declaration,
        _context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        let settings: MetricsSettings = parse_settings(&declaration.settings)?;
        let listen = settings
            .listen
            .parse()
            .map_err(|_| FeatureError::Address(settings.listen.clone()))?;
        Ok(Arc::new(MetricsApp {
            listen,
            shutdown: ShutdownSignal::new(),
            worker: Mutex::new(None),
        }))
    }
}

#[async_trait]
impl Feature for MetricsApp {
    fn kind(&self) -> FeatureKind {
        FeatureKind::App
    }

    fn type_tag(&self) -> &str {
        "metrics"
    }

    async fn start(&self) -> Result<(), FeatureError> {
        // Serve the endpoint ourselves instead of install(): the exporter
        // future is dropped on stop, which releases the scrape listener.
        let (recorder, exporter) = PrometheusBuilder::new()
            .with_http_listener(self.listen)
            .build()
            .map_err(|err| FeatureError::Other(format!("failed to build metrics exporter: {err}")))?;
        metrics::set_global_recorder(recorder)
            .map_err(|err| FeatureError::Other(format!("failed to install metrics recorder: {err}")))?;

        let mut shutdown = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.recv() => {}
                result = exporter => {
                    if let Err(err) = result {
                        tracing::error!(error = ?err, "metrics exporter failed");
                    }
                }
            }
            tracing::debug!("metrics exporter stopped");
        });
        *self.worker.lock().await = Some(handle);

        tracing::info!(address = %self.listen, "metrics exporter listening");
        Ok(())
    }

    async fn stop(&self) -> Result<(), FeatureError> {
        self.shutdown.trigger();
        // None means start never completed; nothing to wait for. The global
        // recorder stays in place since the metrics crate has no uninstall.
        if let Some(handle) = self.worker.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "metrics exporter join failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declaration(settings: serde_json::Value) -> Declaration {
        Declaration {
            type_tag: "metrics".to_string(),
            tag: None,
            settings,
        }
    }

    #[test]
    fn default_listen_address_parses() {
        let feature = MetricsApp::build(&declaration(serde_json::Value::Null), &Context::new());
        assert!(feature.is_ok());
    }

    #[tokio::test]
    async fn stop_releases_the_scrape_listener() {
        use std::time::Duration;

        let app = MetricsApp::build(
            &declaration(serde_json::json!({ "listen": "127.0.0.1:29187" })),
            &Context::new(),
        )
        .unwrap();
        app.start().await.unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if tokio::net::TcpStream::connect("127.0.0.1:29187").await.is_ok() {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "exporter never came up"
            );
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        app.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(
            tokio::net::TcpStream::connect("127.0.0.1:29187").await.is_err(),
            "scrape listener should be gone after stop"
        );
    }

    #[test]
    fn bad_listen_address_is_rejected() {
        let err = MetricsApp::build(
            &declaration(serde_json::json!({ "listen": "nowhere" })),
            &Context::new(),
        )
        .unwrap_err();
        assert!(matches!(err, FeatureError::Address(addr) if addr == "nowhere"));
    }
}
