//! Diagnostic events emitted over a session's lifetime.
//!
//! Every state change and every command a session sends emits a
//! [`SessionEvent`] through the [`super::EventBus`]. Hosts and tests
//! subscribe to observe a session's trace; nothing depends on anyone
//! listening.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Capability, SessionId, SessionOutcome, SessionState};

/// Domain event emitted by a session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The session moved to a new state.
    StateChanged {
        /// Session identifier.
        session_id: SessionId,
        /// New state.
        state: SessionState,
        /// Transition timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The control server announced a device.
    DeviceDiscovered {
        /// Session identifier.
        session_id: SessionId,
        /// Server-assigned device index.
        device_index: u32,
        /// Device name.
        device_name: String,
        /// Classification against the session's request.
        capability: Capability,
        /// Discovery timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The action command was accepted by the control server.
    CommandDispatched {
        /// Session identifier.
        session_id: SessionId,
        /// Target device index.
        device_index: u32,
        /// `"vibrate"` or `"linear"`.
        action: String,
        /// Dispatch timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The action command could not be submitted.
    CommandFailed {
        /// Session identifier.
        session_id: SessionId,
        /// Target device index.
        device_index: u32,
        /// Error description.
        reason: String,
        /// Failure timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The control server reported that scanning finished.
    ScanningFinished {
        /// Session identifier.
        session_id: SessionId,
        /// Notification timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The delayed stop fired and a stop command was sent.
    StopIssued {
        /// Session identifier.
        session_id: SessionId,
        /// Device that was stopped.
        device_index: u32,
        /// Whether the control server accepted the stop.
        accepted: bool,
        /// Stop timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The session reached its terminal state.
    SessionClosed {
        /// Session identifier.
        session_id: SessionId,
        /// How the session ended.
        outcome: SessionOutcome,
        /// Close timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Returns the session ID associated with this event.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self {
            Self::StateChanged { session_id, .. }
            | Self::DeviceDiscovered { session_id, .. }
            | Self::CommandDispatched { session_id, .. }
            | Self::CommandFailed { session_id, .. }
            | Self::ScanningFinished { session_id, .. }
            | Self::StopIssued { session_id, .. }
            | Self::SessionClosed { session_id, .. } => *session_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::StateChanged { .. } => "state_changed",
            Self::DeviceDiscovered { .. } => "device_discovered",
            Self::CommandDispatched { .. } => "command_dispatched",
            Self::CommandFailed { .. } => "command_failed",
            Self::ScanningFinished { .. } => "scanning_finished",
            Self::StopIssued { .. } => "stop_issued",
            Self::SessionClosed { .. } => "session_closed",
        }
    }
}
