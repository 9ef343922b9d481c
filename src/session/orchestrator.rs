//! Session orchestration: connect, discover, dispatch once, stop later.
//!
//! [`SessionOrchestrator`] drives one request through
//! `idle → connecting → scanning → (dispatched | exhausted) → closed`.
//! Once connected, a [`Session`] owns the client, the scan controller and
//! the dispatched flag, and consumes server notifications one at a time
//! from the subscription channel opened before the connect attempt.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;

use super::dispatcher::CommandDispatcher;
use super::scan::ScanController;
use crate::client::{ControlClient, ControlConnector, DiscoveredDevice, ServerEvent};
use crate::domain::{
    ActionRequest, DeviceInfo, EventBus, SessionEvent, SessionId, SessionOutcome, SessionState,
    classify,
};

/// Drives one [`ActionRequest`] from connection to its terminal outcome.
///
/// There are no retries: every failure goes straight to `closed`.
#[derive(Debug)]
pub struct SessionOrchestrator<K> {
    id: SessionId,
    connector: Arc<K>,
    request: ActionRequest,
    event_bus: EventBus,
    state: SessionState,
}

impl<K: ControlConnector> SessionOrchestrator<K> {
    /// Prepares a session in the `idle` state.
    #[must_use]
    pub fn new(connector: Arc<K>, request: ActionRequest, event_bus: EventBus) -> Self {
        Self {
            id: SessionId::new(),
            connector,
            request,
            event_bus,
            state: SessionState::Idle,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Runs the session to completion.
    ///
    /// Returns once the command has been dispatched (the stop keeps running
    /// in the background), once scanning ended with nothing dispatched, or
    /// once the connection attempt failed.
    pub async fn run(mut self) -> SessionOutcome {
        tracing::info!(
            session_id = %self.id,
            address = %self.request.address(),
            action = self.request.payload().kind(),
            "session started"
        );
        self.transition(SessionState::Connecting);

        let (events_tx, mut events) = mpsc::unbounded_channel();
        let client = match self.connector.connect(self.request.address(), events_tx).await {
            Ok(client) => Arc::new(client),
            Err(err) => {
                tracing::warn!(
                    session_id = %self.id,
                    address = %self.request.address(),
                    error = %err,
                    "control server connection failed"
                );
                return self.close(SessionOutcome::ConnectionFailed);
            }
        };

        let mut session = Session::new(self.id, client, self.event_bus.clone());
        self.transition(SessionState::Scanning);
        let outcome = if session.start_discovery().await {
            loop {
                let Some(event) = events.recv().await else {
                    break SessionOutcome::Exhausted;
                };
                if let Some(outcome) = session.handle(event, &self.request).await {
                    break outcome;
                }
            }
        } else {
            // No scan is running, so nothing new will be announced: only the
            // devices already reported can still be used.
            let mut outcome = SessionOutcome::Exhausted;
            while let Ok(event) = events.try_recv() {
                if let Some(done) = session.handle(event, &self.request).await {
                    outcome = done;
                    break;
                }
            }
            outcome
        };

        self.transition(match outcome {
            SessionOutcome::Exhausted | SessionOutcome::ConnectionFailed => {
                SessionState::Exhausted
            }
            SessionOutcome::Dispatched { .. } | SessionOutcome::CommandFailed { .. } => {
                SessionState::Dispatched
            }
        });
        self.close(outcome)
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {next}",
            self.state
        );
        self.state = next;
        tracing::debug!(session_id = %self.id, state = %next, "session state changed");
        let _ = self.event_bus.publish(SessionEvent::StateChanged {
            session_id: self.id,
            state: next,
            timestamp: Utc::now(),
        });
    }

    fn close(mut self, outcome: SessionOutcome) -> SessionOutcome {
        self.transition(SessionState::Closed);
        tracing::info!(session_id = %self.id, ?outcome, "session closed");
        let _ = self.event_bus.publish(SessionEvent::SessionClosed {
            session_id: self.id,
            outcome,
            timestamp: Utc::now(),
        });
        outcome
    }
}

/// A connected session: the client, discovery state and the dispatched
/// flag.
///
/// Only the orchestrator's task touches it, so the flag needs no lock.
#[derive(Debug)]
pub struct Session<C> {
    id: SessionId,
    client: Arc<C>,
    scan: ScanController<C>,
    dispatcher: CommandDispatcher<C>,
    event_bus: EventBus,
    dispatched: bool,
}

impl<C: ControlClient> Session<C> {
    /// Wraps a freshly connected client.
    #[must_use]
    pub fn new(id: SessionId, client: Arc<C>, event_bus: EventBus) -> Self {
        Self {
            id,
            scan: ScanController::new(Arc::clone(&client), id),
            dispatcher: CommandDispatcher::new(Arc::clone(&client), id, event_bus.clone()),
            client,
            event_bus,
            dispatched: false,
        }
    }

    /// Returns `true` once a command has been sent (or attempted).
    #[must_use]
    pub const fn is_dispatched(&self) -> bool {
        self.dispatched
    }

    /// Starts discovery. Returns `false` if the server refused; the refusal
    /// is logged and only devices the server already knew about remain.
    pub async fn start_discovery(&mut self) -> bool {
        match self.scan.start().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(session_id = %self.id, error = %err, "start scanning failed");
                false
            }
        }
    }

    /// Handles one server notification. Returns the session outcome once
    /// the session is done.
    pub async fn handle(
        &mut self,
        event: ServerEvent,
        request: &ActionRequest,
    ) -> Option<SessionOutcome> {
        match event {
            ServerEvent::DeviceAdded(info) => self.on_device(&info, request).await,
            ServerEvent::DeviceRemoved { device_index } => {
                tracing::debug!(session_id = %self.id, device_index, "device removed");
                None
            }
            ServerEvent::ScanningFinished => {
                self.scan.on_finished();
                let _ = self.event_bus.publish(SessionEvent::ScanningFinished {
                    session_id: self.id,
                    timestamp: Utc::now(),
                });
                (!self.dispatched).then_some(SessionOutcome::Exhausted)
            }
            ServerEvent::Disconnected { reason } => {
                tracing::warn!(session_id = %self.id, %reason, "control server disconnected");
                (!self.dispatched).then_some(SessionOutcome::Exhausted)
            }
        }
    }

    async fn on_device(
        &mut self,
        info: &DeviceInfo,
        request: &ActionRequest,
    ) -> Option<SessionOutcome> {
        if self.dispatched {
            tracing::debug!(
                session_id = %self.id,
                device_index = info.index,
                "action already dispatched; ignoring device"
            );
            return None;
        }

        let capability = classify(info, request);
        let _ = self.event_bus.publish(SessionEvent::DeviceDiscovered {
            session_id: self.id,
            device_index: info.index,
            device_name: info.name.clone(),
            capability,
            timestamp: Utc::now(),
        });
        if !capability.is_supported() {
            tracing::debug!(
                session_id = %self.id,
                device_index = info.index,
                device = %info.name,
                action = request.payload().kind(),
                "device does not support the requested action"
            );
            return None;
        }

        self.dispatched = true;
        let device = DiscoveredDevice::new(info, self.client.as_ref());
        let outcome = match self.dispatcher.dispatch(&device, capability, request).await {
            // The stop timer runs detached from here on.
            Ok(stop) => SessionOutcome::Dispatched {
                device_index: stop.device_index(),
            },
            Err(_) => SessionOutcome::CommandFailed {
                device_index: info.index,
            },
        };
        self.scan.halt().await;
        Some(outcome)
    }
}
