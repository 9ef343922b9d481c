//! Scripted in-memory control server for session tests.
//!
//! Records every call with the (possibly paused) tokio clock so tests can
//! assert both the order of a session's trace and the delay before the
//! stop command.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use url::Url;

use crate::client::{ControlClient, ControlConnector, EventSender, ServerEvent};
use crate::domain::action::parse_address;
use crate::domain::{
    ActionPayload, ActionRequest, DeviceInfo, Intensity, LinearMove, LinearTarget,
};
use crate::error::RelayError;

pub const ADDRESS: &str = "ws://localhost:12345/buttplug";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(String),
    StartScanning,
    StopScanning,
    Vibrate { device: u32, intensity: Intensity },
    Linear { device: u32, movement: LinearMove },
    StopDevice(u32),
}

#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<(Call, Instant)>>>);

impl Trace {
    fn record(&self, call: Call) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((call, Instant::now()));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(call, _)| call.clone())
            .collect()
    }

    pub fn time_of(&self, call: &Call) -> Option<Instant> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(recorded, _)| recorded == call)
            .map(|(_, at)| *at)
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }
}

/// What the fake server does.
#[derive(Debug, Clone, Default)]
pub struct Script {
    /// Fail the connect attempt.
    pub refuse_connect: bool,
    /// Devices reported right after connecting.
    pub known_devices: Vec<DeviceInfo>,
    /// Devices reported once scanning starts.
    pub discovered: Vec<DeviceInfo>,
    /// Report scanning finished after the discovered devices.
    pub finish_scan: bool,
    /// Reject the start scanning command.
    pub refuse_scan: bool,
    /// Reject vibrate and linear commands.
    pub reject_commands: bool,
}

#[derive(Debug)]
pub struct FakeConnector {
    script: Script,
    trace: Trace,
}

impl FakeConnector {
    pub fn new(script: Script) -> (Self, Trace) {
        let trace = Trace::default();
        let connector = Self {
            script,
            trace: trace.clone(),
        };
        (connector, trace)
    }
}

#[async_trait]
impl ControlConnector for FakeConnector {
    type Client = FakeClient;

    async fn connect(&self, address: &Url, events: EventSender) -> Result<FakeClient, RelayError> {
        self.trace.record(Call::Connect(address.to_string()));
        if self.script.refuse_connect {
            return Err(RelayError::ConnectionFailed(
                "connection refused".to_string(),
            ));
        }
        for device in &self.script.known_devices {
            let _ = events.send(ServerEvent::DeviceAdded(device.clone()));
        }
        Ok(FakeClient {
            script: self.script.clone(),
            reject: AtomicBool::new(self.script.reject_commands),
            trace: self.trace.clone(),
            events: Some(events),
        })
    }
}

#[derive(Debug)]
pub struct FakeClient {
    script: Script,
    reject: AtomicBool,
    trace: Trace,
    events: Option<EventSender>,
}

impl FakeClient {
    /// A client with no server behind it: calls are recorded and answered.
    pub fn standalone() -> (Self, Trace) {
        let trace = Trace::default();
        let client = Self {
            script: Script::default(),
            reject: AtomicBool::new(false),
            trace: trace.clone(),
            events: None,
        };
        (client, trace)
    }

    pub fn reject_commands(&self) {
        self.reject.store(true, Ordering::SeqCst);
    }

    fn answer(&self) -> Result<(), RelayError> {
        if self.reject.load(Ordering::SeqCst) {
            Err(RelayError::CommandRejected {
                code: 3,
                message: "device refused".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ControlClient for FakeClient {
    async fn start_scanning(&self) -> Result<(), RelayError> {
        self.trace.record(Call::StartScanning);
        if self.script.refuse_scan {
            return Err(RelayError::CommandRejected {
                code: 1,
                message: "no device manager".to_string(),
            });
        }
        if let Some(events) = &self.events {
            for device in &self.script.discovered {
                let _ = events.send(ServerEvent::DeviceAdded(device.clone()));
            }
            if self.script.finish_scan {
                let _ = events.send(ServerEvent::ScanningFinished);
            }
        }
        Ok(())
    }

    async fn stop_scanning(&self) -> Result<(), RelayError> {
        self.trace.record(Call::StopScanning);
        Ok(())
    }

    async fn vibrate(&self, device: &DeviceInfo, intensity: &Intensity) -> Result<(), RelayError> {
        self.trace.record(Call::Vibrate {
            device: device.index,
            intensity: intensity.clone(),
        });
        self.answer()
    }

    async fn linear(&self, device: &DeviceInfo, movement: &LinearMove) -> Result<(), RelayError> {
        self.trace.record(Call::Linear {
            device: device.index,
            movement: movement.clone(),
        });
        self.answer()
    }

    async fn stop_device(&self, device_index: u32) -> Result<(), RelayError> {
        self.trace.record(Call::StopDevice(device_index));
        Ok(())
    }
}

pub fn device(index: u32, vibrators: u32, linears: u32) -> DeviceInfo {
    DeviceInfo {
        index,
        name: format!("device-{index}"),
        vibrate_actuators: (0..vibrators).collect(),
        linear_actuators: linears,
    }
}

fn request(payload: ActionPayload, timeout_ms: u64) -> ActionRequest {
    let Ok(address) = parse_address(ADDRESS) else {
        panic!("valid address");
    };
    let Ok(request) = ActionRequest::new(address, Duration::from_millis(timeout_ms), payload) else {
        panic!("valid request");
    };
    request
}

pub fn vibrate_request(intensity: Intensity, timeout_ms: u64) -> ActionRequest {
    request(ActionPayload::Vibrate(intensity), timeout_ms)
}

pub fn linear_request(
    target: LinearTarget,
    duration_ms: Option<u64>,
    timeout_ms: u64,
) -> ActionRequest {
    request(
        ActionPayload::Linear(LinearMove {
            target,
            duration: duration_ms.map(Duration::from_millis),
        }),
        timeout_ms,
    )
}
