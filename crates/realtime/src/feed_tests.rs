//! Tests for the change feed and auth channel.

use serde_json::json;
use uuid::Uuid;

use crate::{AuthEventKind, AuthEvents, ChangeEvent, ChangeFeed, ChangeFilter, ChangeOp};

fn message(repair_id: &str, content: &str) -> ChangeEvent {
    ChangeEvent::new(
        "messages",
        ChangeOp::Insert,
        &json!({ "repair_id": repair_id, "content": content }),
    )
    .unwrap()
}

#[test]
fn filter_parses_column_equality() {
    let filter: ChangeFilter = "messages:repair_id=eq.abc".parse().unwrap();
    assert_eq!(filter.table, "messages");
    assert_eq!(filter.column_eq, Some(("repair_id".into(), "abc".into())));

    assert!("messages:repair_id=abc".parse::<ChangeFilter>().is_err());
    assert!("".parse::<ChangeFilter>().is_err());
    assert_eq!("timeslots".parse::<ChangeFilter>().unwrap(), ChangeFilter::table("timeslots"));
}

#[test]
fn filter_compares_non_string_columns_by_json_text() {
    let event =
        ChangeEvent::new("timeslots", ChangeOp::Update, &json!({ "spots_taken": 3 })).unwrap();
    assert!(ChangeFilter::table("timeslots").eq("spots_taken", 3).matches(&event));
    assert!(!ChangeFilter::table("timeslots").eq("spots_taken", 4).matches(&event));
    assert!(!ChangeFilter::table("timeslots").eq("missing", "x").matches(&event));
}

#[test]
fn publish_without_subscribers_is_fine() {
    let feed = ChangeFeed::new(4);
    assert_eq!(feed.publish(message("a", "hello")), 0);
}

#[tokio::test]
async fn subscription_skips_other_rows() {
    let feed = ChangeFeed::new(16);
    let mut sub = feed.subscribe(ChangeFilter::table("messages").eq("repair_id", "a"));

    feed.publish(message("b", "not for you"));
    feed.publish(ChangeEvent::new("timeslots", ChangeOp::Update, &json!({})).unwrap());
    feed.publish(message("a", "first"));
    feed.publish(message("a", "second"));

    assert_eq!(sub.recv().await.unwrap().record["content"], "first");
    assert_eq!(sub.recv().await.unwrap().record["content"], "second");
}

#[tokio::test]
async fn lagged_subscriber_keeps_receiving() {
    let feed = ChangeFeed::new(2);
    let mut sub = feed.subscribe(ChangeFilter::table("messages"));
    for i in 0..5 {
        feed.publish(message("a", &i.to_string()));
    }
    // The two newest survive the overflow.
    assert_eq!(sub.recv().await.unwrap().record["content"], "3");
    assert_eq!(sub.recv().await.unwrap().record["content"], "4");
}

#[tokio::test]
async fn closed_feed_ends_subscription() {
    let feed = ChangeFeed::new(4);
    let mut sub = feed.subscribe(ChangeFilter::table("messages"));
    drop(feed);
    assert!(sub.recv().await.is_none());
}

#[tokio::test]
async fn auth_events_are_per_user() {
    let events = AuthEvents::new(8);
    let (me, other) = (Uuid::new_v4(), Uuid::new_v4());
    let mut sub = events.subscribe(me);

    events.publish(other, AuthEventKind::SignedIn);
    events.publish(me, AuthEventKind::SignedOut);

    let event = sub.recv().await.unwrap();
    assert_eq!(event.user_id, me);
    assert_eq!(event.kind, AuthEventKind::SignedOut);
}
