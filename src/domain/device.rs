//! Declared capabilities of a device announced by the control server.

use serde::Serialize;

/// Snapshot of what a discovered device says it can do.
///
/// Built from a device-added notification and only ever borrowed while that
/// notification is handled; the session does not keep devices around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Server-assigned device index, used to address commands.
    pub index: u32,
    /// Human-readable device name.
    pub name: String,
    /// Scalar actuator indices whose actuator type is vibration.
    pub vibrate_actuators: Vec<u32>,
    /// Number of linear actuators.
    pub linear_actuators: u32,
}

impl DeviceInfo {
    /// Number of vibration motors.
    #[must_use]
    pub fn vibrate_count(&self) -> usize {
        self.vibrate_actuators.len()
    }

    /// Number of linear actuators.
    #[must_use]
    pub const fn linear_count(&self) -> u32 {
        self.linear_actuators
    }
}
