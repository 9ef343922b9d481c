//! Control server message envelope (Buttplug protocol, message version 3).
//!
//! Every websocket text frame carries a JSON array of messages; each message
//! is an object with a single key naming its type:
//!
//! ```json
//! [{"StartScanning": {"Id": 4}}]
//! ```
//!
//! Only the subset a single-action session needs is modeled. Unknown server
//! messages fail to deserialize and are skipped by the reader.

use serde::{Deserialize, Serialize};

use crate::domain::DeviceInfo;

/// Protocol version requested during the handshake.
pub const MESSAGE_VERSION: u32 = 3;

/// Actuator type string for vibration motors.
pub const ACTUATOR_VIBRATE: &str = "Vibrate";

/// Message carrying only an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Id {
    /// Correlation id; `0` for server-initiated messages.
    pub id: u32,
}

/// Opening handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestServerInfo {
    /// Correlation id.
    pub id: u32,
    /// Name the server shows for this client.
    pub client_name: String,
    /// Requested protocol version.
    pub message_version: u32,
}

/// One scalar actuator setting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalarSubcommand {
    /// Scalar actuator index on the device.
    pub index: u32,
    /// Level in `[0.0, 1.0]`.
    pub scalar: f64,
    /// Actuator type, e.g. [`ACTUATOR_VIBRATE`].
    pub actuator_type: String,
}

/// Set scalar actuator levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalarCmd {
    /// Correlation id.
    pub id: u32,
    /// Target device.
    pub device_index: u32,
    /// Per-actuator levels.
    pub scalars: Vec<ScalarSubcommand>,
}

/// One linear actuator movement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct VectorSubcommand {
    /// Linear actuator index on the device.
    pub index: u32,
    /// Movement duration in milliseconds.
    pub duration: u32,
    /// Target position in `[0.0, 1.0]`.
    pub position: f64,
}

/// Move linear actuators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinearCmd {
    /// Correlation id.
    pub id: u32,
    /// Target device.
    pub device_index: u32,
    /// Per-actuator movements.
    pub vectors: Vec<VectorSubcommand>,
}

/// Message addressed to one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceCmd {
    /// Correlation id.
    pub id: u32,
    /// Target device.
    pub device_index: u32,
}

/// Client → server messages.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ClientMessage {
    /// Handshake.
    RequestServerInfo(RequestServerInfo),
    /// Keep-alive.
    Ping(Id),
    /// Start discovery.
    StartScanning(Id),
    /// Stop discovery.
    StopScanning(Id),
    /// Ask for the devices the server already knows.
    RequestDeviceList(Id),
    /// Vibrate and other scalar actuators.
    ScalarCmd(ScalarCmd),
    /// Linear actuators.
    LinearCmd(LinearCmd),
    /// Stop one device.
    StopDeviceCmd(DeviceCmd),
}

impl ClientMessage {
    /// Correlation id of this message.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::RequestServerInfo(m) => m.id,
            Self::Ping(m) | Self::StartScanning(m) | Self::StopScanning(m) => m.id,
            Self::RequestDeviceList(m) => m.id,
            Self::ScalarCmd(m) => m.id,
            Self::LinearCmd(m) => m.id,
            Self::StopDeviceCmd(m) => m.id,
        }
    }

    /// Encodes the message as a single-element frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which only happens for non-finite
    /// floats.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&[self])
    }
}

/// Reply to a failed request, or an unsolicited server error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorMessage {
    /// Id of the failed request.
    pub id: u32,
    /// Human-readable reason.
    pub error_message: String,
    /// Server error class.
    #[serde(default)]
    pub error_code: u32,
}

/// Handshake reply.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServerInfo {
    /// Id of the handshake request.
    pub id: u32,
    /// Server display name.
    #[serde(default)]
    pub server_name: String,
    /// Protocol version the server speaks.
    pub message_version: u32,
    /// Milliseconds the server waits for a ping before disconnecting;
    /// `0` disables pinging.
    #[serde(default)]
    pub max_ping_time: u32,
}

/// Declared scalar actuator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ScalarAttributes {
    /// Actuator type, e.g. `"Vibrate"` or `"Rotate"`.
    pub actuator_type: String,
    /// Number of distinct levels.
    #[serde(default)]
    pub step_count: u32,
}

/// Declared linear actuator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LinearAttributes {
    /// Number of distinct positions.
    #[serde(default)]
    pub step_count: u32,
}

/// Commands a device accepts, with per-actuator attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeviceMessages {
    /// Scalar actuators.
    #[serde(rename = "ScalarCmd", default)]
    pub scalar_cmd: Vec<ScalarAttributes>,
    /// Linear actuators.
    #[serde(rename = "LinearCmd", default)]
    pub linear_cmd: Vec<LinearAttributes>,
}

/// Device description, used both in `DeviceAdded` and inside `DeviceList`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceEntry {
    /// `0` for `DeviceAdded`; absent inside `DeviceList`.
    #[serde(default)]
    pub id: u32,
    /// Server-assigned device index.
    pub device_index: u32,
    /// Device name.
    pub device_name: String,
    /// Accepted commands.
    #[serde(default)]
    pub device_messages: DeviceMessages,
}

impl From<DeviceEntry> for DeviceInfo {
    fn from(entry: DeviceEntry) -> Self {
        let vibrate_actuators = entry
            .device_messages
            .scalar_cmd
            .iter()
            .zip(0u32..)
            .filter(|(attrs, _)| attrs.actuator_type == ACTUATOR_VIBRATE)
            .map(|(_, index)| index)
            .collect();
        let linear_actuators =
            u32::try_from(entry.device_messages.linear_cmd.len()).unwrap_or(u32::MAX);
        Self {
            index: entry.device_index,
            name: entry.device_name,
            vibrate_actuators,
            linear_actuators,
        }
    }
}

/// Reply to `RequestDeviceList`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceList {
    /// Id of the request.
    pub id: u32,
    /// Known devices.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// Server → client messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum ServerMessage {
    /// Request accepted.
    Ok(Id),
    /// Request rejected.
    Error(ErrorMessage),
    /// Handshake reply.
    ServerInfo(ServerInfo),
    /// Known devices.
    DeviceList(DeviceList),
    /// A device became available.
    DeviceAdded(DeviceEntry),
    /// A device went away.
    DeviceRemoved(DeviceCmd),
    /// Discovery ended.
    ScanningFinished(Id),
}

impl ServerMessage {
    /// Correlation id of this message.
    #[must_use]
    pub const fn id(&self) -> u32 {
        match self {
            Self::Ok(m) | Self::ScanningFinished(m) => m.id,
            Self::Error(m) => m.id,
            Self::ServerInfo(m) => m.id,
            Self::DeviceList(m) => m.id,
            Self::DeviceAdded(m) => m.id,
            Self::DeviceRemoved(m) => m.id,
        }
    }

    /// Message type name, for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ok(_) => "Ok",
            Self::Error(_) => "Error",
            Self::ServerInfo(_) => "ServerInfo",
            Self::DeviceList(_) => "DeviceList",
            Self::DeviceAdded(_) => "DeviceAdded",
            Self::DeviceRemoved(_) => "DeviceRemoved",
            Self::ScanningFinished(_) => "ScanningFinished",
        }
    }
}
