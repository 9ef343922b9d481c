//! Relay service: validates triggers and spawns sessions.

use std::sync::Arc;

use crate::client::ControlConnector;
use crate::domain::{
    ActionRequest, EventBus, Intensity, LinearTarget, SessionId, SessionOutcome, TriggerArgs,
    TriggerOptions,
};
use crate::error::RelayError;
use crate::session::SessionOrchestrator;

/// Stateless, re-entrant trigger front door.
///
/// Every trigger gets its own session with its own connection; concurrent
/// triggers never share state beyond the connector and the event bus.
#[derive(Debug)]
pub struct Relay<K> {
    connector: Arc<K>,
    event_bus: EventBus,
}

impl<K> Clone for Relay<K> {
    fn clone(&self) -> Self {
        Self {
            connector: Arc::clone(&self.connector),
            event_bus: self.event_bus.clone(),
        }
    }
}

impl<K: ControlConnector> Relay<K> {
    /// Creates a relay connecting through `connector`.
    #[must_use]
    pub fn new(connector: Arc<K>, event_bus: EventBus) -> Self {
        Self {
            connector,
            event_bus,
        }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Fire-and-forget trigger: validates `options`, spawns the session and
    /// returns its identifier without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a validation error ([`RelayError::InvalidAddress`] or
    /// [`RelayError::InvalidRequest`]) before anything is spawned. Failures
    /// after that point are only logged.
    pub fn trigger(&self, options: TriggerOptions) -> Result<SessionId, RelayError> {
        let orchestrator = self.prepare(options)?;
        let session_id = orchestrator.id();
        tokio::spawn(orchestrator.run());
        Ok(session_id)
    }

    /// Positional form of [`Relay::trigger`].
    ///
    /// # Errors
    ///
    /// Same as [`Relay::trigger`].
    pub fn trigger_with(
        &self,
        connect_address: impl Into<String>,
        timeout_ms: u64,
        vibrate: Option<Intensity>,
        linear: Option<LinearTarget>,
        linear_duration_ms: Option<u64>,
    ) -> Result<SessionId, RelayError> {
        self.trigger(
            TriggerArgs(
                connect_address.into(),
                timeout_ms,
                vibrate,
                linear,
                linear_duration_ms,
            )
            .into(),
        )
    }

    /// Runs one session to completion and returns how it ended.
    ///
    /// The delayed stop, if armed, still runs in the background after this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `options` are rejected.
    pub async fn run(&self, options: TriggerOptions) -> Result<SessionOutcome, RelayError> {
        let orchestrator = self.prepare(options)?;
        Ok(orchestrator.run().await)
    }

    fn prepare(&self, options: TriggerOptions) -> Result<SessionOrchestrator<K>, RelayError> {
        let request = ActionRequest::try_from(options).inspect_err(|err| {
            tracing::warn!(error = %err, "trigger rejected");
        })?;
        Ok(SessionOrchestrator::new(
            Arc::clone(&self.connector),
            request,
            self.event_bus.clone(),
        ))
    }
}
