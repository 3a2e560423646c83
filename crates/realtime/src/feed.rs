//! Table change events and the broadcast feed that carries them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

use crate::RealtimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// One committed row change.  `record` is the row as JSON, after the write
/// (before it, for deletes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub op: ChangeOp,
    pub record: Value,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new<T: Serialize>(
        table: impl Into<String>,
        op: ChangeOp,
        record: &T,
    ) -> Result<Self, RealtimeError> {
        Ok(Self {
            table: table.into(),
            op,
            record: serde_json::to_value(record)?,
            at: Utc::now(),
        })
    }

    /// Column value rendered the way filters compare it: strings bare,
    /// everything else as its JSON text.
    pub fn column(&self, name: &str) -> Option<String> {
        match self.record.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Which events a subscriber wants: every change to `table`, optionally
/// narrowed to rows whose `column` equals a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: String,
    pub column_eq: Option<(String, String)>,
}

impl ChangeFilter {
    pub fn table(table: impl Into<String>) -> Self {
        Self { table: table.into(), column_eq: None }
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.column_eq = Some((column.into(), value.to_string()));
        self
    }

    /// Parse the `column=eq.value` form used by subscription requests.
    pub fn parse(table: impl Into<String>, expr: &str) -> Result<Self, RealtimeError> {
        let (column, value) = expr
            .split_once("=eq.")
            .filter(|(c, v)| !c.is_empty() && !v.is_empty())
            .ok_or_else(|| RealtimeError::InvalidFilter(expr.to_owned()))?;
        Ok(Self::table(table).eq(column, value))
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        match &self.column_eq {
            None => true,
            Some((column, value)) => event.column(column).as_deref() == Some(value.as_str()),
        }
    }
}

impl FromStr for ChangeFilter {
    type Err = RealtimeError;

    /// `table` or `table:column=eq.value`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            None if !s.is_empty() => Ok(Self::table(s)),
            None => Err(RealtimeError::InvalidFilter(s.to_owned())),
            Some((table, expr)) => Self::parse(table, expr),
        }
    }
}

/// Fan-out of [`ChangeEvent`]s to any number of subscribers.
/// Clones publish into the same channel.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish without waiting.  Returns how many subscribers were live;
    /// zero is not an error.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        debug!(table = %event.table, op = %event.op, "publishing change");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        Subscription { rx: self.tx.subscribe(), filter }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(crate::DEFAULT_CAPACITY)
    }
}

/// A filtered receiver.  Dropping it unsubscribes.
pub struct Subscription {
    rx: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl Subscription {
    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Next matching event, or `None` once every publisher is gone.
    /// A subscriber that falls behind skips what it missed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(table = %self.filter.table, skipped, "change subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
