//! Capability classification: does a device fit the requested action?

use serde::Serialize;

use super::action::{ActionPayload, ActionRequest};
use super::device::DeviceInfo;

/// Which command, if any, a device can carry out for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// The device has vibration motors and the request asks for vibration.
    Vibration,
    /// The device has linear actuators and the request asks for a timed
    /// linear movement.
    Linear,
    /// The device cannot serve this request; it is ignored.
    Unsupported,
}

impl Capability {
    /// Returns `true` unless the device is unsupported.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Classifies `device` against `request`. Pure.
///
/// A linear request only qualifies a device when a movement duration was
/// supplied, whatever actuators the device has.
#[must_use]
pub fn classify(device: &DeviceInfo, request: &ActionRequest) -> Capability {
    match request.payload() {
        ActionPayload::Vibrate(_) if device.vibrate_count() > 0 => Capability::Vibration,
        ActionPayload::Linear(movement)
            if device.linear_count() > 0 && movement.duration.is_some() =>
        {
            Capability::Linear
        }
        _ => Capability::Unsupported,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::action::{Intensity, LinearMove, LinearTarget, parse_address};

    fn device(vibrators: u32, linears: u32) -> DeviceInfo {
        DeviceInfo {
            index: 0,
            name: "test device".to_string(),
            vibrate_actuators: (0..vibrators).collect(),
            linear_actuators: linears,
        }
    }

    fn request(payload: ActionPayload) -> ActionRequest {
        let Ok(address) = parse_address("ws://localhost:12345/buttplug") else {
            panic!("valid address");
        };
        let Ok(request) = ActionRequest::new(address, Duration::from_millis(1000), payload) else {
            panic!("valid request");
        };
        request
    }

    fn vibrate() -> ActionRequest {
        request(ActionPayload::Vibrate(Intensity::Uniform(0.5)))
    }

    fn linear(duration: Option<Duration>) -> ActionRequest {
        request(ActionPayload::Linear(LinearMove {
            target: LinearTarget::Position(0.8),
            duration,
        }))
    }

    #[test]
    fn vibration_needs_a_vibrator() {
        assert_eq!(classify(&device(1, 0), &vibrate()), Capability::Vibration);
        assert_eq!(classify(&device(0, 2), &vibrate()), Capability::Unsupported);
    }

    #[test]
    fn linear_needs_a_linear_actuator() {
        let req = linear(Some(Duration::from_millis(500)));
        assert_eq!(classify(&device(0, 1), &req), Capability::Linear);
        assert_eq!(classify(&device(3, 0), &req), Capability::Unsupported);
    }

    #[test]
    fn linear_without_duration_never_qualifies() {
        let req = linear(None);
        for linears in 0..4 {
            for vibrators in 0..3 {
                let capability = classify(&device(vibrators, linears), &req);
                assert_ne!(capability, Capability::Linear);
                assert!(!capability.is_supported());
            }
        }
    }
}
