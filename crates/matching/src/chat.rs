//! Per-request conversations: a public thread everyone can read and
//! private threads between the requester and one other person.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use db::models::{MessageRow, NewMessage, ProductRow, ProfileRow, RepairRequestRow, ThreadFilter};
use db::{DbError, Store};
use realtime::{ChangeFeed, ChangeFilter, ChangeOp, Subscription};

use crate::error::or_missing;
use crate::views::{product_info, Participant};
use crate::{dashboard, publish, validation, MatchingError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Thread {
    #[default]
    Public,
    Private,
}

impl Thread {
    fn filter_for(self, user_id: Uuid) -> ThreadFilter {
        match self {
            Self::Public => ThreadFilter::Public,
            Self::Private => ThreadFilter::PrivateFor(user_id),
        }
    }
}

fn default_public() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendMessage {
    pub content: String,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub recipient_id: Option<Uuid>,
}

/// A message with its sender's display name and initials.
#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: MessageRow,
    pub sender: Participant,
}

/// One entry of the chat list.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub repair: RepairRequestRow,
    pub product: Option<ProductRow>,
    pub last_message: MessageRow,
    pub other_user: Participant,
    pub last_activity: String,
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn Store>,
    changes: ChangeFeed,
}

impl ChatService {
    pub fn new(store: Arc<dyn Store>, changes: ChangeFeed) -> Self {
        Self { store, changes }
    }

    /// Post to the public thread, or privately to `recipient_id`.  One
    /// side of every private message is the request's owner.
    #[instrument(skip(self, input), fields(is_public = input.is_public))]
    pub async fn send(
        &self,
        sender_id: Uuid,
        repair_id: Uuid,
        input: SendMessage,
    ) -> Result<MessageView, MatchingError> {
        let content = validation::message_content(&input.content)?;
        let request = self.load_request(repair_id).await?;

        let recipient_id = match (input.is_public, input.recipient_id) {
            (true, None) => None,
            (true, Some(_)) => {
                return Err(MatchingError::validation(
                    "recipient_id",
                    "public messages have no recipient",
                ))
            }
            (false, None) => {
                return Err(MatchingError::validation(
                    "recipient_id",
                    "private messages need a recipient",
                ))
            }
            (false, Some(recipient)) => {
                if recipient == sender_id {
                    return Err(MatchingError::validation(
                        "recipient_id",
                        "you cannot message yourself",
                    ));
                }
                if sender_id != request.user_id && recipient != request.user_id {
                    return Err(MatchingError::forbidden(
                        "private messages must involve the requester",
                    ));
                }
                self.store.get_profile(recipient).await.map_err(or_missing("recipient"))?;
                Some(recipient)
            }
        };

        let message = self
            .store
            .create_message(NewMessage {
                repair_id,
                sender_id,
                recipient_id,
                is_public: input.is_public,
                content,
            })
            .await?;
        publish(&self.changes, "messages", ChangeOp::Insert, &message);
        debug!(message_id = %message.message_id, "message sent");

        let sender = self.store.get_profile(sender_id).await;
        Ok(MessageView {
            sender: Participant::new(sender_id, optional_profile(sender)?.as_ref()),
            message,
        })
    }

    /// A thread oldest first.  Private history only holds the caller's own
    /// messages, sent or received.
    pub async fn history(
        &self,
        user_id: Uuid,
        repair_id: Uuid,
        thread: Thread,
    ) -> Result<Vec<MessageView>, MatchingError> {
        self.load_request(repair_id).await?;
        let messages = self.store.list_messages(repair_id, thread.filter_for(user_id)).await?;

        let mut sender_ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let profiles: HashMap<Uuid, ProfileRow> = self
            .store
            .list_profiles(&sender_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(messages
            .into_iter()
            .map(|message| MessageView {
                sender: Participant::new(message.sender_id, profiles.get(&message.sender_id)),
                message,
            })
            .collect())
    }

    /// Live messages of one thread, from now on.
    pub async fn subscribe(
        &self,
        user_id: Uuid,
        repair_id: Uuid,
        thread: Thread,
    ) -> Result<MessageSubscription, MatchingError> {
        self.load_request(repair_id).await?;
        let inner = self
            .changes
            .subscribe(ChangeFilter::table("messages").eq("repair_id", repair_id));
        Ok(MessageSubscription {
            inner,
            thread: thread.filter_for(user_id),
            store: self.store.clone(),
        })
    }

    /// Requests the user owns or has private messages on, each with its
    /// latest private message, newest activity first.
    #[instrument(skip(self))]
    pub async fn conversations(
        &self,
        user_id: Uuid,
        search: Option<String>,
    ) -> Result<Vec<Conversation>, MatchingError> {
        let mut repair_ids: Vec<Uuid> = self
            .store
            .list_repair_requests_for_user(user_id)
            .await?
            .into_iter()
            .map(|r| r.repair_id)
            .collect();
        for id in self.store.repairs_with_private_messages(user_id).await? {
            if !repair_ids.contains(&id) {
                repair_ids.push(id);
            }
        }
        let repairs = self.store.list_repair_requests_by_ids(&repair_ids).await?;

        let now = Utc::now();
        let mut out = Vec::new();
        for repair in repairs {
            let Some(last_message) =
                self.store.latest_private_message(repair.repair_id, user_id).await?
            else {
                continue;
            };
            let other_id = if last_message.sender_id == user_id {
                last_message.recipient_id
            } else {
                Some(last_message.sender_id)
            };
            let Some(other_id) = other_id else {
                continue;
            };
            let other = optional_profile(self.store.get_profile(other_id).await)?;
            let product = match self.store.get_product(repair.product_id).await {
                Ok(product) => Some(product),
                Err(DbError::NotFound) => None,
                Err(err) => return Err(err.into()),
            };
            out.push(Conversation {
                last_activity: dashboard::relative_time(last_message.created_at, now),
                other_user: Participant::new(other_id, other.as_ref()),
                repair,
                product,
                last_message,
            });
        }

        let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
        out.retain(|c| {
            needle.is_empty()
                || c.other_user.name.to_lowercase().contains(&needle)
                || c.product
                    .as_ref()
                    .map_or(false, |p| product_info(p).to_lowercase().contains(&needle))
                || c.repair.description.to_lowercase().contains(&needle)
        });
        out.sort_by(|a, b| b.last_message.created_at.cmp(&a.last_message.created_at));
        Ok(out)
    }

    async fn load_request(&self, repair_id: Uuid) -> Result<RepairRequestRow, MatchingError> {
        self.store
            .get_repair_request(repair_id)
            .await
            .map_err(or_missing("repair request"))
    }
}

fn optional_profile(
    result: Result<ProfileRow, DbError>,
) -> Result<Option<ProfileRow>, MatchingError> {
    match result {
        Ok(profile) => Ok(Some(profile)),
        Err(DbError::NotFound) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Live feed of one thread as seen by one user.
pub struct MessageSubscription {
    inner: Subscription,
    thread: ThreadFilter,
    store: Arc<dyn Store>,
}

impl MessageSubscription {
    /// Next visible message, or `None` when the feed closes.
    pub async fn next(&mut self) -> Option<MessageView> {
        loop {
            let event = self.inner.recv().await?;
            if event.op != ChangeOp::Insert {
                continue;
            }
            let message: MessageRow = match serde_json::from_value(event.record) {
                Ok(message) => message,
                Err(err) => {
                    warn!("skipping undecodable message event: {}", err);
                    continue;
                }
            };
            if !self.thread.matches(&message) {
                continue;
            }
            let profile = self.store.get_profile(message.sender_id).await.ok();
            return Some(MessageView {
                sender: Participant::new(message.sender_id, profile.as_ref()),
                message,
            });
        }
    }
}
