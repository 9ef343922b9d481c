//! Trigger and event stream DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{SessionEvent, SessionId};

/// Response body for `POST /trigger` (202 Accepted).
///
/// Acceptance only means the options were valid and a session was
/// spawned; the session's outcome is never reported back.
#[derive(Debug, Serialize)]
pub struct TriggerAccepted {
    /// Identifier of the spawned session, as it appears in logs.
    pub session_id: SessionId,
    /// Server acceptance timestamp.
    pub accepted_at: DateTime<Utc>,
}

impl TriggerAccepted {
    /// Stamps an accepted session with the current time.
    #[must_use]
    pub fn now(session_id: SessionId) -> Self {
        Self {
            session_id,
            accepted_at: Utc::now(),
        }
    }
}

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct EventFilter {
    /// Only stream events of this session.
    #[serde(default)]
    pub session_id: Option<SessionId>,
}

impl EventFilter {
    /// Returns `true` if `event` passes the filter.
    #[must_use]
    pub fn matches(&self, event: &SessionEvent) -> bool {
        self.session_id.is_none_or(|id| id == event.session_id())
    }
}
