//! Labels the dashboard lists show.

use chrono::{DateTime, Utc};

use db::models::RepairStatus;

/// Whole days between `at` and `now`, as a label.  Future instants count
/// as today.
pub fn relative_day(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - at).num_days() {
        days if days <= 0 => "Today".into(),
        1 => "Yesterday".into(),
        days @ 2..=6 => format!("{days} days ago"),
        _ => at.format("%b %-d, %Y").to_string(),
    }
}

/// Like [`relative_day`], but today shows the time of day.  Used for
/// conversation activity.
pub fn relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - at).num_days() {
        days if days <= 0 => at.format("%H:%M").to_string(),
        _ => relative_day(at, now),
    }
}

pub fn status_label(status: RepairStatus) -> &'static str {
    match status {
        RepairStatus::Pending => "Pending",
        RepairStatus::Accepted => "Accepted",
        RepairStatus::Scheduled => "Scheduled",
        RepairStatus::Completed => "Completed",
        RepairStatus::Cancelled => "Cancelled",
    }
}
