//! Outbound notifications: verification codes and contact-form messages.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::info;

use crate::contact::ContactMessage;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotifyError(pub String);

/// Delivery channel for messages that leave the system.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError>;

    async fn forward_contact(&self, message: &ContactMessage) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.  Used until a mail relay is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        info!(%email, %code, %expires_at, "verification code issued");
        Ok(())
    }

    async fn forward_contact(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        info!(
            from = %message.email,
            name = %format!("{} {}", message.first_name, message.last_name),
            subject = message.subject.as_deref().unwrap_or("-"),
            "contact message received"
        );
        Ok(())
    }
}

/// Keeps everything it is asked to send.  For tests and local tooling.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    codes: Mutex<Vec<(String, String)>>,
    contacts: Mutex<Vec<ContactMessage>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent code sent to `email`.
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.codes
            .lock()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn codes_sent(&self) -> usize {
        self.codes.lock().len()
    }

    pub fn contacts(&self) -> Vec<ContactMessage> {
        self.contacts.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_verification_code(
        &self,
        email: &str,
        code: &str,
        _expires_at: DateTime<Utc>,
    ) -> Result<(), NotifyError> {
        self.codes.lock().push((email.to_owned(), code.to_owned()));
        Ok(())
    }

    async fn forward_contact(&self, message: &ContactMessage) -> Result<(), NotifyError> {
        self.contacts.lock().push(message.clone());
        Ok(())
    }
}
