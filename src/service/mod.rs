//! Service layer: the public trigger entry points.
//!
//! [`Relay`] validates trigger options, spawns one session per trigger and
//! reports session progress through the [`super::domain::EventBus`].

pub mod relay;

pub use relay::Relay;
