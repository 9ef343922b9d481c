//! Per-trigger session: connect, discover, dispatch one command, stop it.
//!
//! - [`SessionOrchestrator`] owns the lifecycle of one request.
//! - [`ScanController`] starts and halts discovery.
//! - [`CommandDispatcher`] sends the command and arms the [`StopTimer`].

pub mod dispatcher;
pub mod orchestrator;
pub mod scan;

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod fake;

pub use dispatcher::{CommandDispatcher, StopTimer};
pub use orchestrator::{Session, SessionOrchestrator};
pub use scan::{ScanController, ScanState};
