//! `realtime` crate: in-process change feeds.
//!
//! Services publish a [`ChangeEvent`] after every committed write to a
//! watched table, and an [`AuthEvent`] whenever a session starts or ends.
//! HTTP handlers subscribe with a filter and forward matching events to
//! clients as server-sent events.
//!
//! Delivery is best-effort and in publish order.  There is no replay: a
//! subscriber only sees events published after it subscribed.

pub mod auth;
pub mod error;
pub mod feed;

pub use auth::{AuthEvent, AuthEventKind, AuthEvents, AuthSubscription};
pub use error::RealtimeError;
pub use feed::{ChangeEvent, ChangeFeed, ChangeFilter, ChangeOp, Subscription};

/// Channel capacity used when none is configured.
pub const DEFAULT_CAPACITY: usize = 256;

#[cfg(test)]
mod feed_tests;
