//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::client::WsControlConnector;
use crate::domain::EventBus;
use crate::service::Relay;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Trigger entry points backed by the websocket connector.
    pub relay: Arc<Relay<WsControlConnector>>,
    /// Session event bus, streamed by `GET /api/v1/events`.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds the state around a connector, sharing one event bus between
    /// the relay and the handlers.
    #[must_use]
    pub fn new(connector: WsControlConnector, event_bus: EventBus) -> Self {
        Self {
            relay: Arc::new(Relay::new(Arc::new(connector), event_bus.clone())),
            event_bus,
        }
    }
}
