//! # haptic-relay
//!
//! Fire-and-forget haptic triggers for a device-control server.
//!
//! A host hands the relay a control server address, a timeout and one
//! action (vibrate or linear). The relay connects over websocket, waits for
//! the first device able to perform the action, sends it exactly once and
//! always tells that device to stop once the timeout has elapsed. The host
//! is never told how it went; progress is logged and published on the
//! [`domain::EventBus`].
//!
//! ## Architecture
//!
//! ```text
//! Host (HTTP, or Relay called in-process)
//!     │
//!     ├── REST Handlers + SSE event stream (api/)
//!     │
//!     ├── Relay (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── SessionOrchestrator (session/)
//!     │     ├── ScanController
//!     │     └── CommandDispatcher → StopTimer
//!     │
//!     └── ControlConnector / ControlClient (client/)
//!           └── websocket JSON protocol
//! ```

pub mod api;
pub mod app_state;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod session;

pub use domain::{SessionOutcome, TriggerArgs, TriggerOptions};
pub use error::RelayError;
pub use service::Relay;
