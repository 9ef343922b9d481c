//! Session states and terminal outcomes.

use std::fmt;

use serde::Serialize;

/// Where a session is in its lifecycle.
///
/// ```text
/// idle → connecting → scanning → (dispatched | exhausted) → closed
///             └──────────────────────────────────────────────┘ (connect failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, nothing sent yet.
    Idle,
    /// Websocket connect and handshake in progress.
    Connecting,
    /// Connected, waiting for a device that fits the request.
    Scanning,
    /// A command went out (or was attempted) to one device.
    Dispatched,
    /// Scanning ended with nothing dispatched.
    Exhausted,
    /// Terminal.
    Closed,
}

impl SessionState {
    /// Returns `true` if the session may move from `self` to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Connecting)
                | (Self::Connecting, Self::Scanning)
                | (Self::Connecting, Self::Closed)
                | (Self::Scanning, Self::Dispatched)
                | (Self::Scanning, Self::Exhausted)
                | (Self::Dispatched, Self::Closed)
                | (Self::Exhausted, Self::Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Scanning => "scanning",
            Self::Dispatched => "dispatched",
            Self::Exhausted => "exhausted",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// How a session ended. Never reported to the caller of a fire-and-forget
/// trigger; visible through logs and [`super::SessionEvent::SessionClosed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// The command was accepted and the delayed stop is armed.
    Dispatched {
        /// Index of the device that received the command.
        device_index: u32,
    },
    /// A device qualified but the command was rejected; no stop is armed.
    CommandFailed {
        /// Index of the device the command was sent to.
        device_index: u32,
    },
    /// No device qualified before scanning ended.
    Exhausted,
    /// The control server could not be reached.
    ConnectionFailed,
}
