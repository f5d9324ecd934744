//! Instance lifecycle state machine.

use std::fmt;

use thiserror::Error;

use crate::features::FeatureError;
use crate::instance::Instance;
use crate::registry::FeatureKind;

/// Strictly forward-progressing state of a composition.
///
/// The one shortcut: a failed start lands directly in `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Closed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Starting => "starting",
            LifecycleState::Running => "running",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("operation invalid in the {0} state")]
    InvalidState(LifecycleState),

    #[error("{kind} \"{type_tag}\" failed to start")]
    Startup {
        kind: FeatureKind,
        type_tag: String,
        #[source]
        source: FeatureError,
    },

    #[error("{} feature(s) failed to stop cleanly", .0.len())]
    Shutdown(Vec<(String, FeatureError)>),
}

/// Owns a built [`Instance`] and drives its start/close transitions.
pub struct LifecycleController {
    instance: Instance,
    state: LifecycleState,
    /// Count of features whose start hook succeeded; the stop watermark.
    started: usize,
}

impl LifecycleController {
    pub fn new(instance: Instance) -> Self {
        Self {
            instance,
            state: LifecycleState::Created,
            started: 0,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Start every feature in construction order.
    ///
    /// Valid only from `Created`. On any hook failure the features that
    /// already started are stopped in reverse order, the controller lands
    /// in `Closed`, and the composition cannot be restarted.
    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        if self.state != LifecycleState::Created {
            return Err(LifecycleError::InvalidState(self.state));
        }
        self.state = LifecycleState::Starting;

        for index in 0..self.instance.features().len() {
            let slot = &self.instance.features()[index];
            tracing::debug!(feature = %slot.label(), "starting");

            if let Err(source) = slot.feature.start().await {
                let kind = slot.kind;
                let type_tag = slot.type_tag.clone();
                tracing::error!(
                    feature = %slot.label(),
                    error = %source,
                    "start failed, rolling back"
                );
                self.stop_started().await;
                self.state = LifecycleState::Closed;
                return Err(LifecycleError::Startup {
                    kind,
                    type_tag,
                    source,
                });
            }
            self.started = index + 1;
        }

        self.state = LifecycleState::Running;
        tracing::info!(features = self.started, "instance running");
        Ok(())
    }

    /// Stop every started feature in reverse construction order: inbounds
    /// first, then outbounds, then apps.
    ///
    /// Valid from `Running`. Once the controller is `Closed` (including
    /// after a failed start) further calls are a benign no-op, so no
    /// feature's stop hook ever runs twice. Stop failures are collected and
    /// reported together; they never prevent stopping the rest.
    pub async fn close(&mut self) -> Result<(), LifecycleError> {
        match self.state {
            LifecycleState::Closed => {
                tracing::debug!("close on an already closed instance");
                return Ok(());
            }
            LifecycleState::Running => {}
            other => return Err(LifecycleError::InvalidState(other)),
        }

        self.state = LifecycleState::Stopping;
        let failures = self.stop_started().await;
        self.state = LifecycleState::Closed;
        tracing::info!("instance closed");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LifecycleError::Shutdown(failures))
        }
    }

    /// Reverse-order stop of the features below the start watermark.
    async fn stop_started(&mut self) -> Vec<(String, FeatureError)> {
        let mut failures = Vec::new();
        while self.started > 0 {
            self.started -= 1;
            let slot = &self.instance.features()[self.started];
            tracing::debug!(feature = %slot.label(), "stopping");
            if let Err(err) = slot.feature.stop().await {
                tracing::warn!(feature = %slot.label(), error = %err, "stop failed");
                failures.push((slot.label(), err));
            }
        }
        failures
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        // Scoped-acquisition guard: every exit path should close first.
        if self.state == LifecycleState::Running {
            tracing::warn!("lifecycle controller dropped while running; features were not stopped");
        }
    }
}
