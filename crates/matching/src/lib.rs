//! `matching` crate: the RepairBuddies service layer.
//!
//! Services hold an `Arc<dyn Store>` and the realtime channels, enforce the
//! access and validation rules, and publish a change event after every
//! committed write.  The HTTP crate is a thin shell over [`Services`].

use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use db::Store;
use realtime::{AuthEvents, ChangeEvent, ChangeFeed, ChangeOp};

pub mod auth;
pub mod booking;
pub mod chat;
pub mod contact;
pub mod dashboard;
pub mod demo;
pub mod error;
pub mod notifier;
pub mod requests;
pub mod settings;
pub mod validation;
pub mod views;

pub use auth::{AuthService, Registration, Session, SignUpOutcome};
pub use booking::{BookingService, TimeslotPlan, TimeslotSelection};
pub use chat::{ChatService, MessageSubscription, SendMessage, Thread};
pub use contact::{ContactMessage, ContactService};
pub use demo::DemoService;
pub use error::MatchingError;
pub use notifier::{LogNotifier, Notifier, RecordingNotifier};
pub use requests::RequestService;
pub use settings::Settings;

#[cfg(test)]
mod test_support;
#[cfg(test)]
mod booking_tests;
#[cfg(test)]
mod chat_tests;
#[cfg(test)]
mod requests_tests;

/// Every service, wired to one store and one set of channels.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn Store>,
    pub changes: ChangeFeed,
    pub auth_events: AuthEvents,
    pub auth: AuthService,
    pub requests: RequestService,
    pub booking: BookingService,
    pub chat: ChatService,
    pub contact: ContactService,
    pub demo: DemoService,
}

impl Services {
    pub fn new(
        store: Arc<dyn Store>,
        changes: ChangeFeed,
        auth_events: AuthEvents,
        notifier: Arc<dyn Notifier>,
        settings: Settings,
    ) -> Self {
        Self {
            auth: AuthService::new(
                store.clone(),
                auth_events.clone(),
                notifier.clone(),
                settings.auth.clone(),
            ),
            requests: RequestService::new(store.clone(), changes.clone(), auth_events.clone()),
            booking: BookingService::new(store.clone(), changes.clone(), settings.booking.clone()),
            chat: ChatService::new(store.clone(), changes.clone()),
            contact: ContactService::new(notifier),
            demo: DemoService::new(store.clone(), changes.clone(), settings.demo.clone()),
            store,
            changes,
            auth_events,
        }
    }
}

/// Publish a committed row change.  The write already happened, so an
/// encoding failure is logged and swallowed.
pub(crate) fn publish<T: Serialize>(feed: &ChangeFeed, table: &str, op: ChangeOp, record: &T) {
    match ChangeEvent::new(table, op, record) {
        Ok(event) => {
            feed.publish(event);
        }
        Err(err) => warn!(table, %op, "dropping change event: {}", err),
    }
}
