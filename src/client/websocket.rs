//! Websocket control client built on `tokio-tungstenite`.
//!
//! A connection is split into two tasks: a writer draining an mpsc queue of
//! encoded frames into the socket, and a reader routing replies to the
//! request awaiting them (by message id) and forwarding notifications to the
//! session's [`EventSender`]. Dropping the [`WsControlClient`] closes the
//! queue, which makes the writer close the socket.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use url::Url;

use super::messages::{
    ACTUATOR_VIBRATE, ClientMessage, DeviceCmd, Id, LinearCmd, MESSAGE_VERSION,
    RequestServerInfo, ScalarCmd, ScalarSubcommand, ServerInfo, ServerMessage, VectorSubcommand,
};
use super::{ControlClient, ControlConnector, EventSender, ServerEvent};
use crate::config::RelayConfig;
use crate::domain::{DeviceInfo, Intensity, LinearMove};
use crate::error::RelayError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingReplies = Arc<Mutex<Pending>>;

/// Requests awaiting a reply, plus whether the connection can still
/// deliver one.
#[derive(Debug, Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<u32, oneshot::Sender<ServerMessage>>,
}

impl Pending {
    /// Fails every waiting request and refuses new ones.
    fn close(&mut self) {
        self.closed = true;
        self.waiters.clear();
    }
}

/// Opens websocket connections to a control server.
#[derive(Debug, Clone)]
pub struct WsControlConnector {
    client_name: String,
    connect_timeout: Duration,
}

impl WsControlConnector {
    /// Creates a connector announcing itself as `client_name`. Both the TCP
    /// and websocket upgrade and the handshake must finish within
    /// `connect_timeout`.
    #[must_use]
    pub fn new(client_name: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            client_name: client_name.into(),
            connect_timeout,
        }
    }

    /// Creates a connector from the relay configuration.
    #[must_use]
    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(
            config.client_name.clone(),
            Duration::from_millis(config.connect_timeout_ms),
        )
    }

    async fn open(
        &self,
        address: &Url,
        events: EventSender,
    ) -> Result<WsControlClient, RelayError> {
        let (socket, _) = connect_async(address.as_str())
            .await
            .map_err(|e| RelayError::ConnectionFailed(e.to_string()))?;
        let (sink, stream) = socket.split();

        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let pending = PendingReplies::default();
        tokio::spawn(write_loop(sink, outgoing_rx, Arc::clone(&pending)));
        tokio::spawn(read_loop(stream, Arc::clone(&pending), events.clone()));

        let client = WsControlClient {
            outgoing,
            pending,
            next_id: Arc::new(AtomicU32::new(1)),
        };

        let info = client.handshake(&self.client_name).await?;
        tracing::debug!(
            server = %info.server_name,
            version = info.message_version,
            max_ping_ms = info.max_ping_time,
            "control server handshake complete"
        );
        if info.max_ping_time > 0 {
            let interval = Duration::from_millis(u64::from(info.max_ping_time / 2).max(1));
            tokio::spawn(ping_loop(
                client.outgoing.downgrade(),
                Arc::clone(&client.next_id),
                interval,
            ));
        }

        client.forward_known_devices(&events).await;
        Ok(client)
    }
}

#[async_trait]
impl ControlConnector for WsControlConnector {
    type Client = WsControlClient;

    async fn connect(
        &self,
        address: &Url,
        events: EventSender,
    ) -> Result<WsControlClient, RelayError> {
        tokio::time::timeout(self.connect_timeout, self.open(address, events))
            .await
            .map_err(|_| {
                RelayError::ConnectionFailed(format!(
                    "no handshake within {} ms",
                    self.connect_timeout.as_millis()
                ))
            })?
    }
}

/// A connected control client.
#[derive(Debug)]
pub struct WsControlClient {
    outgoing: mpsc::UnboundedSender<String>,
    pending: PendingReplies,
    next_id: Arc<AtomicU32>,
}

impl WsControlClient {
    fn next_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Sends `message` and waits for the reply carrying its id.
    async fn request(&self, message: ClientMessage) -> Result<ServerMessage, RelayError> {
        let id = message.id();
        let frame = message.to_frame()?;
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            if pending.closed {
                return Err(RelayError::Transport("connection closed".to_string()));
            }
            pending.waiters.insert(id, reply_tx);
        }

        if self.outgoing.send(frame).is_err() {
            self.pending.lock().await.waiters.remove(&id);
            return Err(RelayError::Transport("connection closed".to_string()));
        }

        match reply_rx.await {
            Ok(ServerMessage::Error(err)) => Err(RelayError::CommandRejected {
                code: err.error_code,
                message: err.error_message,
            }),
            Ok(reply) => Ok(reply),
            Err(_) => Err(RelayError::Transport(
                "connection closed before reply".to_string(),
            )),
        }
    }

    /// Sends `message` and expects a plain `Ok`.
    async fn command(&self, message: ClientMessage) -> Result<(), RelayError> {
        match self.request(message).await? {
            ServerMessage::Ok(_) => Ok(()),
            other => Err(RelayError::Protocol(format!(
                "expected Ok, got {}",
                other.name()
            ))),
        }
    }

    async fn handshake(&self, client_name: &str) -> Result<ServerInfo, RelayError> {
        let request = ClientMessage::RequestServerInfo(RequestServerInfo {
            id: self.next_id(),
            client_name: client_name.to_string(),
            message_version: MESSAGE_VERSION,
        });
        match self.request(request).await {
            Ok(ServerMessage::ServerInfo(info)) => Ok(info),
            Ok(other) => Err(RelayError::ConnectionFailed(format!(
                "expected ServerInfo, got {}",
                other.name()
            ))),
            Err(err) => Err(RelayError::ConnectionFailed(err.to_string())),
        }
    }

    /// Reports devices connected before this client arrived as
    /// [`ServerEvent::DeviceAdded`].
    async fn forward_known_devices(&self, events: &EventSender) {
        let request = ClientMessage::RequestDeviceList(Id { id: self.next_id() });
        match self.request(request).await {
            Ok(ServerMessage::DeviceList(list)) => {
                for entry in list.devices {
                    let _ = events.send(ServerEvent::DeviceAdded(entry.into()));
                }
            }
            Ok(other) => {
                tracing::warn!(reply = other.name(), "unexpected reply to device list request");
            }
            Err(err) => tracing::warn!(error = %err, "device list request failed"),
        }
    }
}

#[async_trait]
impl ControlClient for WsControlClient {
    async fn start_scanning(&self) -> Result<(), RelayError> {
        self.command(ClientMessage::StartScanning(Id { id: self.next_id() }))
            .await
    }

    async fn stop_scanning(&self) -> Result<(), RelayError> {
        self.command(ClientMessage::StopScanning(Id { id: self.next_id() }))
            .await
    }

    async fn vibrate(&self, device: &DeviceInfo, intensity: &Intensity) -> Result<(), RelayError> {
        let scalars: Vec<ScalarSubcommand> = device
            .vibrate_actuators
            .iter()
            .enumerate()
            .filter_map(|(motor, &index)| {
                intensity.for_motor(motor).map(|scalar| ScalarSubcommand {
                    index,
                    scalar,
                    actuator_type: ACTUATOR_VIBRATE.to_string(),
                })
            })
            .collect();
        if scalars.is_empty() {
            return Err(RelayError::InvalidRequest(format!(
                "no vibration motor of device {} matches the intensity",
                device.index
            )));
        }
        self.command(ClientMessage::ScalarCmd(ScalarCmd {
            id: self.next_id(),
            device_index: device.index,
            scalars,
        }))
        .await
    }

    async fn linear(&self, device: &DeviceInfo, movement: &LinearMove) -> Result<(), RelayError> {
        let vectors: Vec<VectorSubcommand> = (0..device.linear_actuators)
            .zip(0usize..)
            .filter_map(|(index, actuator)| {
                movement
                    .for_actuator(actuator)
                    .map(|(position, duration)| VectorSubcommand {
                        index,
                        duration,
                        position,
                    })
            })
            .collect();
        if vectors.is_empty() {
            return Err(RelayError::InvalidRequest(format!(
                "no linear actuator of device {} matches the movement",
                device.index
            )));
        }
        self.command(ClientMessage::LinearCmd(LinearCmd {
            id: self.next_id(),
            device_index: device.index,
            vectors,
        }))
        .await
    }

    async fn stop_device(&self, device_index: u32) -> Result<(), RelayError> {
        self.command(ClientMessage::StopDeviceCmd(DeviceCmd {
            id: self.next_id(),
            device_index,
        }))
        .await
    }
}

async fn write_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut outgoing: mpsc::UnboundedReceiver<String>,
    pending: PendingReplies,
) {
    while let Some(frame) = outgoing.recv().await {
        if let Err(err) = sink.send(Message::text(frame)).await {
            tracing::warn!(error = %err, "control server write failed");
            // Nothing sent from now on can be answered.
            pending.lock().await.close();
            break;
        }
    }
    let _ = sink.close().await;
}

async fn read_loop(
    mut stream: SplitStream<WsStream>,
    pending: PendingReplies,
    events: EventSender,
) {
    let reason = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => route_frame(text.as_str(), &pending, &events).await,
            Some(Ok(Message::Close(frame))) => {
                break frame.map_or_else(
                    || "closed by server".to_string(),
                    |f| f.reason.as_str().to_string(),
                );
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => break err.to_string(),
            None => break "stream ended".to_string(),
        }
    };

    tracing::debug!(%reason, "control server connection closed");
    // Dropping the senders fails every request still waiting for a reply.
    pending.lock().await.close();
    let _ = events.send(ServerEvent::Disconnected { reason });
}

async fn route_frame(text: &str, pending: &PendingReplies, events: &EventSender) {
    let messages: Vec<serde_json::Value> = match serde_json::from_str(text) {
        Ok(messages) => messages,
        Err(err) => {
            tracing::warn!(error = %err, "malformed frame from control server");
            return;
        }
    };

    for value in messages {
        let message = match serde_json::from_value::<ServerMessage>(value) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unsupported server message");
                continue;
            }
        };
        match message {
            ServerMessage::DeviceAdded(entry) => {
                let _ = events.send(ServerEvent::DeviceAdded(entry.into()));
            }
            ServerMessage::DeviceRemoved(removed) => {
                let _ = events.send(ServerEvent::DeviceRemoved {
                    device_index: removed.device_index,
                });
            }
            ServerMessage::ScanningFinished(_) => {
                let _ = events.send(ServerEvent::ScanningFinished);
            }
            reply => {
                let id = reply.id();
                match pending.lock().await.waiters.remove(&id) {
                    Some(waiter) => {
                        let _ = waiter.send(reply);
                    }
                    None => tracing::debug!(id, reply = reply.name(), "unsolicited reply"),
                }
            }
        }
    }
}

async fn ping_loop(
    outgoing: mpsc::WeakUnboundedSender<String>,
    next_id: Arc<AtomicU32>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(outgoing) = outgoing.upgrade() else {
            break;
        };
        let ping = ClientMessage::Ping(Id {
            id: next_id.fetch_add(1, Ordering::Relaxed),
        });
        let Ok(frame) = ping.to_frame() else {
            break;
        };
        if outgoing.send(frame).is_err() {
            break;
        }
    }
}
