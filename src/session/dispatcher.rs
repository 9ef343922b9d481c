//! Sends the one action command of a session and arms its delayed stop.
//!
//! The stop is unconditional: the control protocol has no "action
//! finished" signal that works for every actuator kind, so the device is
//! told to halt once the request's timeout elapses, whether or not it
//! already stopped by itself.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::client::{ControlClient, DiscoveredDevice};
use crate::domain::action::duration_ms;
use crate::domain::{ActionPayload, ActionRequest, Capability, EventBus, SessionEvent, SessionId};
use crate::error::RelayError;

/// Issues action commands on behalf of one session.
#[derive(Debug)]
pub struct CommandDispatcher<C> {
    client: Arc<C>,
    session_id: SessionId,
    event_bus: EventBus,
}

impl<C: ControlClient> CommandDispatcher<C> {
    /// Creates a dispatcher sending through `client`.
    #[must_use]
    pub fn new(client: Arc<C>, session_id: SessionId, event_bus: EventBus) -> Self {
        Self {
            client,
            session_id,
            event_bus,
        }
    }

    /// Sends the command matching `capability` to `device` and, once the
    /// server accepted it, arms a stop firing after the request timeout.
    ///
    /// # Errors
    ///
    /// Returns the submission error; no stop is armed in that case.
    /// A capability that does not match the payload yields
    /// [`RelayError::Internal`] without contacting the device.
    pub async fn dispatch(
        &self,
        device: &DiscoveredDevice<'_, C>,
        capability: Capability,
        request: &ActionRequest,
    ) -> Result<StopTimer, RelayError> {
        let device_index = device.info().index;
        let payload = request.payload();
        let submitted = match (capability, payload) {
            (Capability::Vibration, ActionPayload::Vibrate(intensity)) => {
                device.vibrate(intensity).await
            }
            (Capability::Linear, ActionPayload::Linear(movement)) => device.linear(movement).await,
            _ => Err(RelayError::Internal(format!(
                "{capability:?} device cannot serve a {} request",
                payload.kind()
            ))),
        };

        if let Err(err) = submitted {
            tracing::warn!(
                session_id = %self.session_id,
                device_index,
                action = payload.kind(),
                error = %err,
                "command submission failed"
            );
            let _ = self.event_bus.publish(SessionEvent::CommandFailed {
                session_id: self.session_id,
                device_index,
                reason: err.to_string(),
                timestamp: Utc::now(),
            });
            return Err(err);
        }

        tracing::info!(
            session_id = %self.session_id,
            device_index,
            device = %device.info().name,
            action = payload.kind(),
            stop_after_ms = duration_ms(request.timeout()),
            "command dispatched"
        );
        let _ = self.event_bus.publish(SessionEvent::CommandDispatched {
            session_id: self.session_id,
            device_index,
            action: payload.kind().to_string(),
            timestamp: Utc::now(),
        });

        Ok(StopTimer::arm(
            Arc::clone(&self.client),
            device_index,
            request.timeout(),
            self.session_id,
            self.event_bus.clone(),
        ))
    }
}

/// A pending stop command.
///
/// Dropping the timer detaches it; it still fires. Nothing cancels it.
#[derive(Debug)]
pub struct StopTimer {
    device_index: u32,
    handle: JoinHandle<()>,
}

impl StopTimer {
    fn arm<C: ControlClient>(
        client: Arc<C>,
        device_index: u32,
        timeout: Duration,
        session_id: SessionId,
        event_bus: EventBus,
    ) -> Self {
        let deadline = Instant::now() + timeout;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let accepted = match client.stop_device(device_index).await {
                Ok(()) => {
                    tracing::info!(%session_id, device_index, "device stopped");
                    true
                }
                Err(err) => {
                    tracing::warn!(%session_id, device_index, error = %err, "stop command failed");
                    false
                }
            };
            let _ = event_bus.publish(SessionEvent::StopIssued {
                session_id,
                device_index,
                accepted,
                timestamp: Utc::now(),
            });
        });
        Self {
            device_index,
            handle,
        }
    }

    /// Device the stop is addressed to.
    #[must_use]
    pub const fn device_index(&self) -> u32 {
        self.device_index
    }

    /// Waits until the stop command has been sent and answered.
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
