//! Session event stream: the EventBus as server-sent events.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures_util::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::api::dto::EventFilter;
use crate::app_state::AppState;

/// `GET /events`: Stream session events, optionally for one session.
///
/// Each event is sent with its `event_type` as the SSE event name and the
/// JSON-encoded event as data. Only events published after the request
/// arrived are sent.
pub async fn stream_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.event_bus.subscribe())
        .filter_map(move |msg| match msg {
            Ok(event) if filter.matches(&event) => Some(event),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "event stream client lagged behind event bus");
                None
            }
        })
        .map(|event| {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".into());
            Ok(Event::default().event(event.event_type_str()).data(data))
        });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Event stream routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/events", get(stream_events))
}
