//! Connection sink outbound.
//!
//! Accepts the dispatch and immediately drops the connection; useful for
//! cutting off traffic classes by routing them here.

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::TcpStream;

use crate::config::Declaration;
use crate::features::dispatch::{Dispatcher, Outbound, Target};
use crate::features::{Feature, FeatureError};
use crate::instance::Context;
use crate::registry::FeatureKind;

pub struct BlackholeOutbound;

impl BlackholeOutbound {
    /// Constructor registered under (outbound, "blackhole").
    pub fn build(
        declaration: &Declaration,
        context: &Arc<Context>,
    ) -> Result<Arc<dyn Feature>, FeatureError> {
        let dispatcher = context.get::<Dispatcher>().ok_or(FeatureError::Unavailable(
            "the dispatch app must be declared before outbound handlers",
        ))?;

        let tag = declaration.tag.as_deref().unwrap_or("blackhole");
        let outbound = Arc::new(BlackholeOutbound);
        dispatcher.attach_outbound(tag, outbound.clone())?;
        Ok(outbound)
    }
}

#[async_trait]
impl Outbound for BlackholeOutbound {
    async fn handle(&self, stream: TcpStream, target: &Target) -> io::Result<()> {
        tracing::debug!(target = %target, "dropping connection");
        drop(stream);
        Ok(())
    }
}

#[async_trait]
impl Feature for BlackholeOutbound {
    fn kind(&self) -> FeatureKind {
        FeatureKind::Outbound
    }

    fn type_tag(&self) -> &str {
        "blackhole"
    }

    async fn start(&self) -> Result<(), FeatureError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), FeatureError> {
        Ok(())
    }
}
