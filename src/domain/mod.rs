//! Domain layer: action requests, device capabilities, session lifecycle,
//! and the event system.
//!
//! Everything here is transport-agnostic. The classifier is a pure
//! function over [`ActionRequest`] and [`DeviceInfo`]; sessions report
//! progress as [`SessionEvent`]s on the [`EventBus`].

pub mod action;
pub mod capability;
pub mod device;
pub mod event_bus;
pub mod lifecycle;
pub mod session_event;
pub mod session_id;

pub use action::{
    ActionPayload, ActionRequest, Intensity, LinearMove, LinearStep, LinearTarget, TriggerArgs,
    TriggerOptions,
};
pub use capability::{Capability, classify};
pub use device::DeviceInfo;
pub use event_bus::EventBus;
pub use lifecycle::{SessionOutcome, SessionState};
pub use session_event::SessionEvent;
pub use session_id::SessionId;
