use std::{convert::Infallible, time::Duration};

use axum::{
    extract::{Extension, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use futures_util::stream::Stream;
use tokio::sync::broadcast::error::RecvError;

use crate::{AppState, models::CurrentUser, services::alert_monitor::Event};

// GET /events
//
// SSE stream of the service's emitted events. Alert events are delivered
// only to connections authenticated as one of the alerted users;
// connection-status changes go to everyone.
pub async fn sse_events(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events_tx.subscribe();

    let stream = futures_util::stream::unfold((rx, user.id), |(mut rx, user_id)| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let visible = match &event {
                        Event::Alert { user_ids, .. } => user_ids.contains(&user_id),
                        Event::ConnectionStatus { .. } => true,
                    };
                    if !visible {
                        continue;
                    }

                    let name = match &event {
                        Event::Alert { .. } => "alert",
                        Event::ConnectionStatus { .. } => "connection-status",
                    };
                    let data = serde_json::to_string(&event).unwrap_or_default();

                    return Some((
                        Ok(SseEvent::default().event(name).data(data)),
                        (rx, user_id),
                    ));
                }
                Err(RecvError::Lagged(_)) => {
                    return Some((
                        Ok(SseEvent::default().event("ping").data("lagged")),
                        (rx, user_id),
                    ));
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(20))
            .text("keep-alive"),
    )
}
