//! Data Transfer Objects for REST request/response serialization.
//!
//! Trigger request bodies deserialize straight into
//! [`crate::domain::TriggerOptions`] and [`crate::domain::TriggerArgs`];
//! only responses have their own types.

pub mod trigger_dto;

pub use trigger_dto::*;
