//! Live record feed (SSE)

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::AppError;
use crate::state::AppState;

/// GET /events
///
/// Emits a `connected` event, then the registry backlog oldest-first so a
/// client attaching after a restart sees the recent records as ordinary
/// `record` events, then the live feed. Closing the connection drops the
/// broadcast receiver, which removes the subscriber from the bus.
pub async fn stream(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let rx = state.events.subscribe().ok_or(AppError::TooManySubscribers)?;
    tracing::debug!(
        subscribers = state.events.subscriber_count(),
        "event subscriber connected"
    );

    let connected = stream::once(async {
        Ok::<_, Infallible>(
            Event::default()
                .event("connected")
                .data(serde_json::json!({"message": "connected"}).to_string()),
        )
    });

    let backlog: Vec<Event> = {
        let registry = state.registry.lock().await;
        let mut snapshot = registry.snapshot();
        snapshot.reverse();
        snapshot
            .iter()
            .filter_map(|record| serde_json::to_string(record).ok())
            .map(|payload| Event::default().event("record").data(payload))
            .collect()
    };
    let backlog = stream::iter(backlog.into_iter().map(Ok::<_, Infallible>));

    let live = BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(payload) => Some(Ok::<_, Infallible>(
                Event::default().event("record").data(payload.as_str()),
            )),
            // Lagged past the channel buffer; the gap is recoverable from
            // /queue-list or a reconnect's backlog replay.
            Err(_) => None,
        }
    });

    Ok(Sse::new(connected.chain(backlog).chain(live)).keep_alive(KeepAlive::default()))
}
