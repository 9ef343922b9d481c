//! Action requests: the validated, immutable input to one session.
//!
//! Callers hand the relay a [`TriggerOptions`] (or the positional
//! [`TriggerArgs`]); converting it into an [`ActionRequest`] is the only
//! place input is validated, and it happens before any network I/O.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::RelayError;

/// Vibration intensity: one value for every motor, or one value per motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Intensity {
    /// Every vibration motor runs at the same intensity.
    Uniform(f64),
    /// Motor `i` runs at element `i`.
    PerMotor(Vec<f64>),
}

impl Intensity {
    /// Returns the intensity for the `motor`-th vibration motor of a device,
    /// or `None` when a per-motor list is shorter than the motor count.
    #[must_use]
    pub fn for_motor(&self, motor: usize) -> Option<f64> {
        match self {
            Self::Uniform(value) => Some(*value),
            Self::PerMotor(values) => values.get(motor).copied(),
        }
    }

    fn validate(&self) -> Result<(), RelayError> {
        match self {
            Self::Uniform(value) => check_unit("vibrate", *value),
            Self::PerMotor(values) => {
                if values.is_empty() {
                    return Err(RelayError::InvalidRequest(
                        "vibrate list must not be empty".to_string(),
                    ));
                }
                values.iter().try_for_each(|v| check_unit("vibrate", *v))
            }
        }
    }
}

/// One `[position, offset_ms]` entry of a linear movement list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearStep(pub f64, pub u32);

impl LinearStep {
    /// Target position in `[0.0, 1.0]`.
    #[must_use]
    pub const fn position(&self) -> f64 {
        self.0
    }

    /// Time offset in milliseconds.
    #[must_use]
    pub const fn offset_ms(&self) -> u32 {
        self.1
    }
}

/// Linear target: a single position, or a list of `[position, offset_ms]`
/// pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinearTarget {
    /// Every linear actuator moves to this position.
    Position(f64),
    /// Linear actuator `i` moves according to step `i`.
    Steps(Vec<LinearStep>),
}

/// Linear movement: target plus the movement duration.
///
/// The duration is optional at the type level so that a request carrying a
/// linear target without a duration can still be represented; such a request
/// never qualifies any device (see [`super::capability::classify`]).
#[derive(Debug, Clone, PartialEq)]
pub struct LinearMove {
    /// Where the actuators should move.
    pub target: LinearTarget,
    /// How long a single-position movement takes.
    pub duration: Option<Duration>,
}

impl LinearMove {
    /// Returns `(position, duration_ms)` for the `actuator`-th linear
    /// actuator of a device.
    #[must_use]
    pub fn for_actuator(&self, actuator: usize) -> Option<(f64, u32)> {
        match &self.target {
            LinearTarget::Position(position) => {
                self.duration.map(|d| (*position, duration_ms(d)))
            }
            LinearTarget::Steps(steps) => steps
                .get(actuator)
                .map(|step| (step.position(), step.offset_ms())),
        }
    }

    fn validate(&self) -> Result<(), RelayError> {
        match &self.target {
            LinearTarget::Position(position) => check_unit("linear", *position),
            LinearTarget::Steps(steps) => {
                if steps.is_empty() {
                    return Err(RelayError::InvalidRequest(
                        "linear list must not be empty".to_string(),
                    ));
                }
                steps
                    .iter()
                    .try_for_each(|step| check_unit("linear", step.position()))
            }
        }
    }
}

/// The single action a session performs.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionPayload {
    /// Vibrate at the given intensity.
    Vibrate(Intensity),
    /// Move linear actuators.
    Linear(LinearMove),
}

impl ActionPayload {
    /// Short name used in logs and events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Vibrate(_) => "vibrate",
            Self::Linear(_) => "linear",
        }
    }
}

/// Validated input to one session. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    address: Url,
    timeout: Duration,
    payload: ActionPayload,
}

impl ActionRequest {
    /// Builds a request from already-parsed parts.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidAddress`] if `address` is not a `ws` /
    /// `wss` URI with a host, and [`RelayError::InvalidRequest`] if any
    /// intensity or position falls outside `[0.0, 1.0]`.
    pub fn new(
        address: Url,
        timeout: Duration,
        payload: ActionPayload,
    ) -> Result<Self, RelayError> {
        check_address(&address)?;
        match &payload {
            ActionPayload::Vibrate(intensity) => intensity.validate()?,
            ActionPayload::Linear(movement) => movement.validate()?,
        }
        Ok(Self {
            address,
            timeout,
            payload,
        })
    }

    /// Control server endpoint.
    #[must_use]
    pub const fn address(&self) -> &Url {
        &self.address
    }

    /// Delay between dispatching the action and stopping the device.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The action to perform.
    #[must_use]
    pub const fn payload(&self) -> &ActionPayload {
        &self.payload
    }
}

/// Raw trigger options as supplied by a host.
///
/// ```json
/// { "connectAddress": "ws://localhost:12345/buttplug", "timeout": 3000, "vibrate": 1.0 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOptions {
    /// Websocket URI of the control server.
    pub connect_address: String,
    /// Milliseconds between dispatch and the unconditional stop.
    pub timeout: u64,
    /// Vibration intensity (number or list of numbers).
    #[serde(default)]
    pub vibrate: Option<Intensity>,
    /// Linear target (number or list of `[position, offset_ms]`).
    #[serde(default)]
    pub linear: Option<LinearTarget>,
    /// Linear movement duration in milliseconds.
    #[serde(default)]
    pub linear_duration: Option<u64>,
}

impl TryFrom<TriggerOptions> for ActionRequest {
    type Error = RelayError;

    fn try_from(options: TriggerOptions) -> Result<Self, Self::Error> {
        let address = parse_address(&options.connect_address)?;
        let payload = match (options.vibrate, options.linear) {
            (Some(_), Some(_)) => {
                return Err(RelayError::InvalidRequest(
                    "vibrate and linear are mutually exclusive".to_string(),
                ));
            }
            (None, None) => {
                return Err(RelayError::InvalidRequest(
                    "one of vibrate or linear is required".to_string(),
                ));
            }
            (Some(intensity), None) => ActionPayload::Vibrate(intensity),
            (None, Some(target)) => {
                let Some(ms) = options.linear_duration else {
                    return Err(RelayError::InvalidRequest(
                        "linear requires linearDuration".to_string(),
                    ));
                };
                ActionPayload::Linear(LinearMove {
                    target,
                    duration: Some(Duration::from_millis(ms)),
                })
            }
        };
        Self::new(address, Duration::from_millis(options.timeout), payload)
    }
}

/// Positional form of [`TriggerOptions`]:
/// `[connectAddress, timeout, vibrate, linear, linearDuration]`.
///
/// Trailing optional elements may be omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerArgs(
    /// Websocket URI of the control server.
    pub String,
    /// Timeout in milliseconds.
    pub u64,
    /// Vibration intensity.
    #[serde(default)]
    pub Option<Intensity>,
    /// Linear target.
    #[serde(default)]
    pub Option<LinearTarget>,
    /// Linear movement duration in milliseconds.
    #[serde(default)]
    pub Option<u64>,
);

impl From<TriggerArgs> for TriggerOptions {
    fn from(args: TriggerArgs) -> Self {
        let TriggerArgs(connect_address, timeout, vibrate, linear, linear_duration) = args;
        Self {
            connect_address,
            timeout,
            vibrate,
            linear,
            linear_duration,
        }
    }
}

/// Parses and checks a control server address.
///
/// # Errors
///
/// Returns [`RelayError::InvalidAddress`] for anything that is not an
/// absolute `ws://` or `wss://` URI with a host.
pub fn parse_address(raw: &str) -> Result<Url, RelayError> {
    let url = Url::parse(raw.trim())?;
    check_address(&url)?;
    Ok(url)
}

fn check_address(url: &Url) -> Result<(), RelayError> {
    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(RelayError::InvalidAddress(format!(
            "unsupported scheme `{}`",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(RelayError::InvalidAddress("missing host".to_string()));
    }
    Ok(())
}

fn check_unit(field: &str, value: f64) -> Result<(), RelayError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(RelayError::InvalidRequest(format!(
            "{field} value {value} is outside [0.0, 1.0]"
        )))
    }
}

/// Converts a duration to the millisecond field width the control protocol
/// uses, saturating.
#[must_use]
pub fn duration_ms(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
