//! Direct-connect outbound.
//!
//! Opens a TCP connection to the target and relays bytes both ways until
//! either side closes.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::Declaration;
use crate::features::dispatch::{Dispatcher, Outbound, Target};
use crate::features::{parse_settings, Feature, FeatureError};
use crate::instance::Context;
use crate::registry::FeatureKind;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FreedomSettings {
    /// Upstream connect timeout in seconds.
    connect_timeout_secs: u64,
}

impl Default for FreedomSettings {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
        }
    }
}

pub struct FreedomOutbound {
    connect_timeout: Duration,
}

impl FreedomOutbound {
    /// Constructor registered under (outbound, "freedom").
    pub fn build(
        declaration: &Declaration,
        context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        let settings: FreedomSettings = parse_settings(&declaration.settings)?;
        let dispatcher = context.get::<Dispatcher>().ok_or(FeatureError::Unavailable(
            "the dispatch app must be declared before outbound handlers",
        ))?;

        let tag = declaration.tag.as_deref().unwrap_or("freedom");
        let outbound = Arc::new(FreedomOutbound {
            connect_timeout: Duration::from_secs(settings.connect_timeout_secs),
        });
        dispatcher.attach_outbound(tag, outbound.clone())?;
        Ok(outbound)
    }
}

#[async_trait]
impl Outbound for FreedomOutbound {
    async fn handle(&self, mut stream: TcpStream, target: &Target) -> io::Result<()> {
        let connect = TcpStream::connect((target.address.as_str(), target.port));
        let mut upstream = timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "upstream connect timed out"))??;

        let (bytes_up, bytes_down) =
            tokio::io::copy_bidirectional(&mut stream, &mut upstream).await?;
        tracing::debug!(target = %target, bytes_up, bytes_down, "relay finished");
        Ok(())
    }
}

#[async_trait]
impl Feature for FreedomOutbound {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Outbound
    }

    fn type_tag(&self) -> &str {
        "freedom"
    }

    async fn start(&self) -> Result<(), FeatureError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), FeatureError> {
        Ok(())
    }
}
