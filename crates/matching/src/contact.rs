//! Contact form.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::notifier::Notifier;
use crate::{validation, MatchingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub message: String,
}

#[derive(Clone)]
pub struct ContactService {
    notifier: Arc<dyn Notifier>,
}

impl ContactService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Validate and forward a message to the team.
    #[instrument(skip_all, fields(email = %message.email))]
    pub async fn submit(&self, message: ContactMessage) -> Result<ContactMessage, MatchingError> {
        let cleaned = ContactMessage {
            first_name: validation::name("first_name", &message.first_name)?,
            last_name: validation::name("last_name", &message.last_name)?,
            email: validation::email(&message.email)?,
            subject: validation::optional(message.subject),
            message: validation::contact_message(&message.message)?,
        };
        self.notifier.forward_contact(&cleaned).await?;
        Ok(cleaned)
    }
}
