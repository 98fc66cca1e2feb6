use std::convert::Infallible;

use axum::extract::State;
use axum::response::Sse;
use axum::response::sse::{Event, KeepAlive};
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast::Sender;
use tokio_stream::{Stream, StreamExt, wrappers};

use crate::services::ServiceEvent;

#[derive(Clone)]
pub struct SSEState {
    pub sender: Sender<ServiceEvent>,
}

pub fn sse_router(sse_state: SSEState) -> Router {
    Router::new()
        .route("/api/events", get(sse_handler))
        .with_state(sse_state)
}

fn to_event(event: &ServiceEvent) -> Result<Event, axum::Error> {
    let sse_event = Event::default().event(event.name());

    match event {
        ServiceEvent::ReadingsCreated(readings) => sse_event.json_data(readings),
        ServiceEvent::AlertCreated(alert) => sse_event.json_data(alert),
    }
}

#[utoipa::path(
    get,
    path = "/api/events",
    tag = "events",
    responses(
        (status = 200, description = "Server-sent events named `readings` and `alert`")
    )
)]
pub async fn sse_handler(
    State(state): State<SSEState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.sender.subscribe();

    // Lagged receivers drop the missed events and keep streaming
    let stream = wrappers::BroadcastStream::new(receiver).filter_map(|result| {
        let event = result.ok()?;

        match to_event(&event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                tracing::warn!("failed to encode {} event: {}", event.name(), e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
