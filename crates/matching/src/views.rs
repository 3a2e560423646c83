//! Read models returned by the services: rows joined with what the
//! screens show next to them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use db::models::{ProductRow, ProfileRow, RepairRequestRow, RepairStatus};

use crate::dashboard;

/// A repair request together with its product.
#[derive(Debug, Clone, Serialize)]
pub struct RepairRequestView {
    #[serde(flatten)]
    pub request: RepairRequestRow,
    pub product: ProductRow,
    /// "Today", "Yesterday", "3 days ago", "Mar 4, 2025".
    pub created_label: String,
    pub status_label: String,
}

impl RepairRequestView {
    pub fn new(request: RepairRequestRow, product: ProductRow, now: DateTime<Utc>) -> Self {
        let created_label = dashboard::relative_day(request.created_at, now);
        let status_label = request
            .status
            .parse::<RepairStatus>()
            .map(|s| dashboard::status_label(s).to_owned())
            .unwrap_or_else(|_| request.status.clone());
        Self { request, product, created_label, status_label }
    }

    pub fn status(&self) -> Option<RepairStatus> {
        self.request.status.parse().ok()
    }

    /// "brand model type" with blanks dropped.
    pub fn product_info(&self) -> String {
        product_info(&self.product)
    }

    /// Case-insensitive match on product info or description.
    /// `needle` must already be lower-case.
    pub fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.product_info().to_lowercase().contains(needle)
            || self.request.description.to_lowercase().contains(needle)
    }
}

pub fn product_info(product: &ProductRow) -> String {
    [
        product.brand.as_deref().unwrap_or(""),
        product.model.as_deref().unwrap_or(""),
        product.product_type.as_str(),
    ]
    .iter()
    .filter(|s| !s.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
}

/// Someone shown next to a message or conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Participant {
    pub id: Uuid,
    pub name: String,
    pub initials: String,
}

impl Participant {
    pub fn new(id: Uuid, profile: Option<&ProfileRow>) -> Self {
        Self { id, name: display_name(profile), initials: initials(profile) }
    }
}

/// "First Last"; "User" if both are blank; "Unknown User" without a profile.
pub fn display_name(profile: Option<&ProfileRow>) -> String {
    let Some(profile) = profile else {
        return "Unknown User".into();
    };
    let name = format!(
        "{} {}",
        profile.first_name.as_deref().unwrap_or(""),
        profile.last_name.as_deref().unwrap_or("")
    );
    match name.trim() {
        "" => "User".into(),
        trimmed => trimmed.to_owned(),
    }
}

/// First letter of each name, or "?" when there is nothing to go on.
pub fn initials(profile: Option<&ProfileRow>) -> String {
    let first_letter = |s: Option<&String>| {
        s.and_then(|s| s.trim().chars().next())
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_default()
    };
    let Some(profile) = profile else {
        return "?".into();
    };
    let out = first_letter(profile.first_name.as_ref()) + &first_letter(profile.last_name.as_ref());
    if out.is_empty() {
        "?".into()
    } else {
        out
    }
}
