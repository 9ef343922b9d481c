//! Control-server client seam.
//!
//! A session talks to the device-control server only through the
//! [`ControlConnector`] and [`ControlClient`] traits. Unsolicited server
//! notifications (device added, scanning finished, ...) arrive as
//! [`ServerEvent`]s on a channel the session creates *before* connecting,
//! so nothing the server reports during the handshake is lost.
//!
//! [`websocket`] holds the production implementation.

pub mod messages;
pub mod websocket;

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::domain::{DeviceInfo, Intensity, LinearMove};
use crate::error::RelayError;

pub use websocket::{WsControlClient, WsControlConnector};

/// Notification pushed by the control server outside any request/reply
/// exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// A device became available.
    DeviceAdded(DeviceInfo),
    /// A device went away.
    DeviceRemoved {
        /// Server-assigned device index.
        device_index: u32,
    },
    /// Every discovery backend stopped looking for devices.
    ScanningFinished,
    /// The connection dropped.
    Disconnected {
        /// Close reason or transport error.
        reason: String,
    },
}

/// Sending half of a session's server-event subscription.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// Commands a connected client can submit. Each call resolves once the
/// control server accepted or rejected the command.
#[async_trait]
pub trait ControlClient: Send + Sync + 'static {
    /// Starts device discovery.
    async fn start_scanning(&self) -> Result<(), RelayError>;

    /// Stops device discovery.
    async fn stop_scanning(&self) -> Result<(), RelayError>;

    /// Runs the device's vibration motors.
    async fn vibrate(&self, device: &DeviceInfo, intensity: &Intensity) -> Result<(), RelayError>;

    /// Moves the device's linear actuators.
    async fn linear(&self, device: &DeviceInfo, movement: &LinearMove) -> Result<(), RelayError>;

    /// Halts every actuator of the device.
    async fn stop_device(&self, device_index: u32) -> Result<(), RelayError>;
}

/// Opens connections to a control server.
#[async_trait]
pub trait ControlConnector: Send + Sync + 'static {
    /// Client type produced on success.
    type Client: ControlClient;

    /// Connects to `address` and completes the handshake. Server
    /// notifications, including devices the server already knew about, are
    /// forwarded to `events` from the moment the connection is up.
    async fn connect(
        &self,
        address: &Url,
        events: EventSender,
    ) -> Result<Self::Client, RelayError>;
}

/// Borrowed view of one discovered device, valid while a single
/// notification is handled.
#[derive(Debug)]
pub struct DiscoveredDevice<'a, C> {
    info: &'a DeviceInfo,
    client: &'a C,
}

impl<'a, C: ControlClient> DiscoveredDevice<'a, C> {
    /// Pairs a device announcement with the client it arrived on.
    #[must_use]
    pub const fn new(info: &'a DeviceInfo, client: &'a C) -> Self {
        Self { info, client }
    }

    /// Declared capabilities.
    #[must_use]
    pub const fn info(&self) -> &'a DeviceInfo {
        self.info
    }

    /// Vibrates the device.
    ///
    /// # Errors
    ///
    /// Propagates the client's submission error.
    pub async fn vibrate(&self, intensity: &Intensity) -> Result<(), RelayError> {
        self.client.vibrate(self.info, intensity).await
    }

    /// Moves the device's linear actuators.
    ///
    /// # Errors
    ///
    /// Propagates the client's submission error.
    pub async fn linear(&self, movement: &LinearMove) -> Result<(), RelayError> {
        self.client.linear(self.info, movement).await
    }
}
