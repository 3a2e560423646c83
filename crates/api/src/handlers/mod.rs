//! Route handlers, one module per resource.

pub mod auth;
pub mod chats;
pub mod contact;
pub mod demo;
pub mod health;
pub mod messages;
pub mod profile;
pub mod repair_requests;
pub mod timeslots;

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Serialize;
use tracing::warn;

/// Encode `data` as a named SSE event; encoding failures are logged and
/// yield `None`.
pub(crate) fn sse_event<T: Serialize>(name: &str, data: &T) -> Option<Event> {
    match Event::default().event(name).json_data(data) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(event = name, "could not encode SSE event: {}", err);
            None
        }
    }
}

pub(crate) fn sse<S>(stream: S, keep_alive: Duration) -> Sse<S>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(KeepAlive::new().interval(keep_alive).text("keep-alive"))
}
