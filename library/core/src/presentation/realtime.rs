// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! SSE delivery of realtime events.
//!
//! Each connection subscribes one queue on the bus. The subscription is
//! torn down on every exit path — normal close, error, or client
//! disconnect — via a drop guard owned by the stream.

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Extension;
use futures::Stream;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::domain::events::{library_channel, user_channel};
use crate::domain::identity::RequestContext;
use crate::error::ServiceError;
use crate::infrastructure::event_bus::RealtimeBus;
use super::state::AppState;

const HEARTBEAT: Duration = Duration::from_secs(30);

/// Unsubscribes when the SSE stream is dropped.
struct SubscriptionGuard {
    bus: Arc<RealtimeBus>,
    channel: String,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.bus.unsubscribe(&self.channel, self.id);
    }
}

fn event_stream(
    bus: Arc<RealtimeBus>,
    channel: String,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    let mut subscription = bus.subscribe(&channel);
    let guard = SubscriptionGuard {
        bus,
        channel: channel.clone(),
        id: subscription.id,
    };

    async_stream::stream! {
        // Guard lives as long as the stream; dropping the stream
        // unsubscribes.
        let _guard = guard;

        yield Ok(Event::default()
            .event("connected")
            .data(json!({ "channel": channel }).to_string()));

        while let Some(event) = subscription.receiver.recv().await {
            let data = serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
            yield Ok(Event::default().event(event.event_type.clone()).data(data));
        }
    }
}

/// Subscribe to one library's file/directory/share events.
pub async fn library_events(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
    Path(library_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    // Access check up front; the stream itself carries no identity.
    state.libraries.get(&ctx, library_id).await?;

    let stream = event_stream(state.bus.clone(), library_channel(library_id));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("heartbeat")))
}

/// Subscribe to the caller's own notification channel.
pub async fn notification_events(
    State(state): State<Arc<AppState>>,
    Extension(ctx): Extension<RequestContext>,
) -> impl IntoResponse {
    let stream = event_stream(state.bus.clone(), user_channel(ctx.user.user_id));
    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("heartbeat"))
}
