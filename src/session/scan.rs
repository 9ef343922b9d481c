//! Discovery start/stop bookkeeping for one session.

use std::sync::Arc;

use crate::client::ControlClient;
use crate::domain::SessionId;
use crate::error::RelayError;

/// Discovery state as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Scanning was never started (or failed to start).
    Idle,
    /// The server is looking for devices.
    Scanning,
    /// The session stopped scanning after dispatching.
    Halted,
    /// The server reported that scanning finished on its own.
    Finished,
}

/// Starts discovery, halts it once a device has been dispatched to, and
/// records the server's scanning-finished notification.
///
/// Failures of the start/stop commands are logged and never abort the
/// session.
#[derive(Debug)]
pub struct ScanController<C> {
    client: Arc<C>,
    session_id: SessionId,
    state: ScanState,
}

impl<C: ControlClient> ScanController<C> {
    /// Creates a controller in the [`ScanState::Idle`] state.
    #[must_use]
    pub fn new(client: Arc<C>, session_id: SessionId) -> Self {
        Self {
            client,
            session_id,
            state: ScanState::Idle,
        }
    }

    /// Current discovery state.
    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// Returns `true` while the server is scanning on our behalf.
    #[must_use]
    pub fn is_scanning(&self) -> bool {
        self.state == ScanState::Scanning
    }

    /// Asks the server to start discovery.
    ///
    /// # Errors
    ///
    /// Returns the client's error if the server refused or the transport
    /// failed; the state stays [`ScanState::Idle`].
    pub async fn start(&mut self) -> Result<(), RelayError> {
        self.client.start_scanning().await?;
        self.state = ScanState::Scanning;
        tracing::debug!(session_id = %self.session_id, "scanning started");
        Ok(())
    }

    /// Stops discovery if it is running. Idempotent.
    pub async fn halt(&mut self) {
        if !self.is_scanning() {
            return;
        }
        self.state = ScanState::Halted;
        match self.client.stop_scanning().await {
            Ok(()) => tracing::debug!(session_id = %self.session_id, "scanning stopped"),
            Err(err) => {
                tracing::warn!(session_id = %self.session_id, error = %err, "stop scanning failed");
            }
        }
    }

    /// Records that the server finished scanning without being asked to.
    pub fn on_finished(&mut self) {
        tracing::info!(session_id = %self.session_id, "scanning finished");
        if self.state != ScanState::Halted {
            self.state = ScanState::Finished;
        }
    }
}
