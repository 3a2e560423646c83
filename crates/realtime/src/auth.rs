//! Session lifecycle notifications, one channel for every user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    UserUpdated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub user_id: Uuid,
    pub kind: AuthEventKind,
    pub at: DateTime<Utc>,
}

impl AuthEvent {
    pub fn new(user_id: Uuid, kind: AuthEventKind) -> Self {
        Self { user_id, kind, at: Utc::now() }
    }
}

#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
}

impl AuthEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, user_id: Uuid, kind: AuthEventKind) -> usize {
        self.tx.send(AuthEvent::new(user_id, kind)).unwrap_or(0)
    }

    /// Events for one user only.
    pub fn subscribe(&self, user_id: Uuid) -> AuthSubscription {
        AuthSubscription { rx: self.tx.subscribe(), user_id }
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CAPACITY)
    }
}

pub struct AuthSubscription {
    rx: broadcast::Receiver<AuthEvent>,
    user_id: Uuid,
}

impl AuthSubscription {
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.user_id == self.user_id => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "auth subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
