//! End-to-end sessions against an in-process websocket control server.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use haptic_relay::client::WsControlConnector;
use haptic_relay::domain::{EventBus, Intensity, SessionEvent};
use haptic_relay::{Relay, SessionOutcome, TriggerOptions};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Cooperative,
    RejectCommands,
    RejectScanning,
    Silent,
    /// Hang up right after acknowledging `StartScanning`, before any device.
    CloseAfterScanStart,
    /// Hang up right after acknowledging `StopScanning`.
    CloseAfterStopScanning,
    /// Hang up on the action command without answering it.
    CloseOnCommand,
}

/// Answers the handshake, reports one vibrator once scanning starts and
/// returns every message type it received once the client hangs up.
async fn serve(behavior: Behavior) -> (String, JoinHandle<Vec<(String, Instant)>>) {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };

    let server = tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            panic!("accept");
        };
        let Ok(ws) = tokio_tungstenite::accept_async(stream).await else {
            panic!("websocket upgrade");
        };
        let (mut tx, mut rx) = ws.split();
        let mut received = Vec::new();

        while let Some(Ok(message)) = rx.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let Ok(Value::Array(frame)) = serde_json::from_str::<Value>(text.as_str()) else {
                panic!("frame is a json array");
            };
            for message in frame {
                let Some((kind, body)) = message.as_object().and_then(|o| o.iter().next()) else {
                    panic!("message is a single-key object");
                };
                let id = body.pointer("/Id").and_then(Value::as_u64).unwrap_or_default();
                received.push((kind.clone(), Instant::now()));

                let closing = matches!(
                    (kind.as_str(), behavior),
                    ("StartScanning", Behavior::CloseAfterScanStart)
                        | ("StopScanning", Behavior::CloseAfterStopScanning)
                        | ("ScalarCmd", Behavior::CloseOnCommand)
                );
                let replies = match (kind.as_str(), behavior) {
                    (_, Behavior::Silent) | ("ScalarCmd", Behavior::CloseOnCommand) => vec![],
                    ("StartScanning", Behavior::CloseAfterScanStart) => {
                        vec![json!({"Ok": {"Id": id}})]
                    }
                    ("StartScanning", Behavior::RejectScanning) => vec![json!({"Error": {
                        "Id": id,
                        "ErrorMessage": "no device manager",
                        "ErrorCode": 1
                    }})],
                    ("RequestServerInfo", _) => vec![json!({"ServerInfo": {
                        "Id": id,
                        "ServerName": "test server",
                        "MessageVersion": 3,
                        "MaxPingTime": 0
                    }})],
                    ("RequestDeviceList", _) => vec![json!({"DeviceList": {
                        "Id": id,
                        "Devices": []
                    }})],
                    ("StartScanning", _) => vec![
                        json!({"Ok": {"Id": id}}),
                        json!({"DeviceAdded": {
                            "Id": 0,
                            "DeviceIndex": 0,
                            "DeviceName": "Test Stroker",
                            "DeviceMessages": {"LinearCmd": [{"StepCount": 100}]}
                        }}),
                        json!({"DeviceAdded": {
                            "Id": 0,
                            "DeviceIndex": 1,
                            "DeviceName": "Test Vibrator",
                            "DeviceMessages": {"ScalarCmd": [
                                {"ActuatorType": "Vibrate", "StepCount": 20},
                                {"ActuatorType": "Vibrate", "StepCount": 20}
                            ]}
                        }}),
                    ],
                    ("ScalarCmd", Behavior::RejectCommands) => vec![json!({"Error": {
                        "Id": id,
                        "ErrorMessage": "device busy",
                        "ErrorCode": 4
                    }})],
                    _ => vec![json!({"Ok": {"Id": id}})],
                };
                for reply in replies {
                    let frame = Value::Array(vec![reply]).to_string();
                    if tx.send(Message::text(frame)).await.is_err() {
                        return received;
                    }
                }
                if closing {
                    let _ = tx.send(Message::Close(None)).await;
                    return received;
                }
            }
        }
        received
    });

    (format!("ws://{addr}"), server)
}

fn relay(connect_timeout: Duration) -> Relay<WsControlConnector> {
    let connector = WsControlConnector::new("haptic-relay-test", connect_timeout);
    Relay::new(Arc::new(connector), EventBus::new(64))
}

fn vibrate(address: &str, timeout: u64) -> TriggerOptions {
    TriggerOptions {
        connect_address: address.to_string(),
        timeout,
        vibrate: Some(Intensity::PerMotor(vec![0.3, 0.9])),
        linear: None,
        linear_duration: None,
    }
}

async fn finish(server: JoinHandle<Vec<(String, Instant)>>) -> Vec<(String, Instant)> {
    let Ok(Ok(received)) = tokio::time::timeout(Duration::from_secs(5), server).await else {
        panic!("server did not see the client hang up");
    };
    received
}

fn kinds(received: &[(String, Instant)]) -> Vec<&str> {
    received.iter().map(|(kind, _)| kind.as_str()).collect()
}

#[tokio::test]
async fn vibrate_session_stops_the_device_after_timeout() {
    let (address, server) = serve(Behavior::Cooperative).await;

    let outcome = relay(Duration::from_secs(2)).run(vibrate(&address, 200)).await;
    assert!(matches!(
        outcome,
        Ok(SessionOutcome::Dispatched { device_index: 1 })
    ));

    let received = finish(server).await;
    assert_eq!(
        kinds(&received),
        vec![
            "RequestServerInfo",
            "RequestDeviceList",
            "StartScanning",
            "ScalarCmd",
            "StopScanning",
            "StopDeviceCmd",
        ]
    );

    let at = |kind: &str| {
        received
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, at)| *at)
    };
    let (Some(vibrated), Some(stopped)) = (at("ScalarCmd"), at("StopDeviceCmd")) else {
        panic!("missing commands");
    };
    assert!(stopped.duration_since(vibrated) >= Duration::from_millis(200));
}

#[tokio::test]
async fn rejected_command_is_never_stopped() {
    let (address, server) = serve(Behavior::RejectCommands).await;

    let outcome = relay(Duration::from_secs(2)).run(vibrate(&address, 100)).await;
    assert!(matches!(
        outcome,
        Ok(SessionOutcome::CommandFailed { device_index: 1 })
    ));

    let received = finish(server).await;
    assert!(!kinds(&received).contains(&"StopDeviceCmd"));
    assert_eq!(kinds(&received).last(), Some(&"StopScanning"));
}

#[tokio::test]
async fn unanswered_handshake_is_a_connection_failure() {
    let (address, server) = serve(Behavior::Silent).await;

    let outcome = relay(Duration::from_millis(200))
        .run(vibrate(&address, 100))
        .await;
    assert!(matches!(outcome, Ok(SessionOutcome::ConnectionFailed)));

    let received = finish(server).await;
    assert_eq!(kinds(&received), vec!["RequestServerInfo"]);
}

#[tokio::test]
async fn unreachable_server_is_a_connection_failure() {
    let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    drop(listener);

    let outcome = relay(Duration::from_secs(1))
        .run(vibrate(&format!("ws://{addr}"), 100))
        .await;
    assert!(matches!(outcome, Ok(SessionOutcome::ConnectionFailed)));
}

/// Waits for the delayed stop and returns `(device_index, accepted)`.
async fn stop_issued(
    events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
) -> (u32, bool) {
    let wait = async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::StopIssued {
                    device_index,
                    accepted,
                    ..
                }) => break (device_index, accepted),
                Ok(_) => {}
                Err(err) => panic!("event bus failed: {err}"),
            }
        }
    };
    let Ok(stop) = tokio::time::timeout(Duration::from_secs(5), wait).await else {
        panic!("the delayed stop never completed");
    };
    stop
}

#[tokio::test]
async fn stop_after_server_hangs_up_fails_and_is_reported() {
    let (address, server) = serve(Behavior::CloseAfterStopScanning).await;
    let relay = relay(Duration::from_secs(2));
    let mut events = relay.event_bus().subscribe();

    let outcome = relay.run(vibrate(&address, 300)).await;
    assert!(matches!(
        outcome,
        Ok(SessionOutcome::Dispatched { device_index: 1 })
    ));

    assert_eq!(stop_issued(&mut events).await, (1, false));
    let received = finish(server).await;
    assert_eq!(kinds(&received).last(), Some(&"StopScanning"));
}

#[tokio::test]
async fn hang_up_during_scan_ends_the_session() {
    let (address, server) = serve(Behavior::CloseAfterScanStart).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        relay(Duration::from_secs(2)).run(vibrate(&address, 100)),
    )
    .await;
    assert!(matches!(outcome, Ok(Ok(SessionOutcome::Exhausted))));

    let received = finish(server).await;
    assert_eq!(kinds(&received).last(), Some(&"StartScanning"));
}

#[tokio::test]
async fn hang_up_on_the_command_fails_it() {
    let (address, server) = serve(Behavior::CloseOnCommand).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        relay(Duration::from_secs(2)).run(vibrate(&address, 100)),
    )
    .await;
    assert!(matches!(
        outcome,
        Ok(Ok(SessionOutcome::CommandFailed { device_index: 1 }))
    ));

    let received = finish(server).await;
    assert!(!kinds(&received).contains(&"StopDeviceCmd"));
}

#[tokio::test]
async fn refused_scan_ends_the_session() {
    let (address, server) = serve(Behavior::RejectScanning).await;

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        relay(Duration::from_secs(2)).run(vibrate(&address, 100)),
    )
    .await;
    assert!(matches!(outcome, Ok(Ok(SessionOutcome::Exhausted))));

    let received = finish(server).await;
    assert_eq!(
        kinds(&received),
        vec!["RequestServerInfo", "RequestDeviceList", "StartScanning"]
    );
}
