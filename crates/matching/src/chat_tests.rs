//! Chat tests: threads, visibility, live feed and the conversation list.

use std::time::Duration;

use uuid::Uuid;

use crate::chat::{SendMessage, Thread};
use crate::test_support::Harness;
use crate::MatchingError;

fn public(content: &str) -> SendMessage {
    SendMessage { content: content.into(), is_public: true, recipient_id: None }
}

fn private(content: &str, to: Uuid) -> SendMessage {
    SendMessage { content: content.into(), is_public: false, recipient_id: Some(to) }
}

#[tokio::test]
async fn messages_are_trimmed_and_carry_sender_names() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;

    let sent = h
        .services
        .chat
        .send(owner.user_id, repair, public("  Is anyone able to help?  "))
        .await
        .unwrap();
    assert_eq!(sent.message.content, "Is anyone able to help?");
    assert_eq!(sent.sender.name, "Jan Peeters");
    assert_eq!(sent.sender.initials, "JP");

    let err = h.services.chat.send(owner.user_id, repair, public("   ")).await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "content", .. }));
    let err = h
        .services
        .chat
        .send(owner.user_id, repair, public(&"x".repeat(2001)))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "content", .. }));
}

#[tokio::test]
async fn recipient_rules() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let piet = h.repairer("Piet", "piet@example.be").await;
    let mia = h.user("Mia", "mia@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let chat = &h.services.chat;

    let mut with_recipient = public("hello there");
    with_recipient.recipient_id = Some(piet.user_id);
    assert!(chat.send(owner.user_id, repair, with_recipient).await.is_err());

    let mut no_recipient = private("hello there", piet.user_id);
    no_recipient.recipient_id = None;
    assert!(chat.send(owner.user_id, repair, no_recipient).await.is_err());

    let err = chat.send(piet.user_id, repair, private("psst", mia.user_id)).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));
    let err = chat.send(owner.user_id, repair, private("me", owner.user_id)).await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation { .. }));
    let err = chat.send(owner.user_id, repair, private("hi", Uuid::new_v4())).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound("recipient")));
    let err = chat.send(owner.user_id, Uuid::new_v4(), public("hi")).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound("repair request")));
}

#[tokio::test]
async fn private_history_is_only_visible_to_participants() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let piet = h.repairer("Piet", "piet@example.be").await;
    let mia = h.user("Mia", "mia@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let chat = &h.services.chat;

    chat.send(owner.user_id, repair, public("Anyone?")).await.unwrap();
    chat.send(piet.user_id, repair, private("I can look at it", owner.user_id)).await.unwrap();
    chat.send(owner.user_id, repair, private("Great, thanks!", piet.user_id)).await.unwrap();

    let public_thread = chat.history(mia.user_id, repair, Thread::Public).await.unwrap();
    assert_eq!(public_thread.len(), 1);

    let for_owner = chat.history(owner.user_id, repair, Thread::Private).await.unwrap();
    let contents: Vec<&str> = for_owner.iter().map(|m| m.message.content.as_str()).collect();
    assert_eq!(contents, ["I can look at it", "Great, thanks!"]);
    assert_eq!(for_owner[0].sender.name, "Piet Peeters");

    assert!(chat.history(mia.user_id, repair, Thread::Private).await.unwrap().is_empty());
}

#[tokio::test]
async fn subscribers_only_receive_visible_messages() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let piet = h.repairer("Piet", "piet@example.be").await;
    let mia = h.user("Mia", "mia@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let other_repair = h.request(&owner, "Laptop").await.request.repair_id;
    let chat = &h.services.chat;

    let mut mia_private = chat.subscribe(mia.user_id, repair, Thread::Private).await.unwrap();
    let mut piet_private = chat.subscribe(piet.user_id, repair, Thread::Private).await.unwrap();
    let mut mia_public = chat.subscribe(mia.user_id, repair, Thread::Public).await.unwrap();

    chat.send(owner.user_id, other_repair, public("other request")).await.unwrap();
    chat.send(owner.user_id, repair, private("just for Piet", piet.user_id)).await.unwrap();
    chat.send(owner.user_id, repair, public("for everyone")).await.unwrap();

    assert_eq!(piet_private.next().await.unwrap().message.content, "just for Piet");
    let seen = mia_public.next().await.unwrap();
    assert_eq!(seen.message.content, "for everyone");
    assert_eq!(seen.sender.name, "Jan Peeters");

    let nothing = tokio::time::timeout(Duration::from_millis(50), mia_private.next()).await;
    assert!(nothing.is_err(), "Mia must not see the private message");
}

#[tokio::test]
async fn conversations_list_latest_private_message_per_request() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let piet = h.repairer("Piet", "piet@example.be").await;
    let radio = h.request(&owner, "Radio").await.request.repair_id;
    let laptop = h.request(&owner, "Laptop").await.request.repair_id;
    h.request(&owner, "Lighting").await;
    let chat = &h.services.chat;

    chat.send(piet.user_id, radio, private("I can fix the radio", owner.user_id)).await.unwrap();
    chat.send(owner.user_id, radio, private("When suits you?", piet.user_id)).await.unwrap();
    chat.send(owner.user_id, laptop, public("public only")).await.unwrap();

    let mine = chat.conversations(owner.user_id, None).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].repair.repair_id, radio);
    assert_eq!(mine[0].last_message.content, "When suits you?");
    assert_eq!(mine[0].other_user.name, "Piet Peeters");

    let theirs = chat.conversations(piet.user_id, None).await.unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].other_user.id, owner.user_id);

    assert_eq!(chat.conversations(owner.user_id, Some("radio".into())).await.unwrap().len(), 1);
    assert_eq!(chat.conversations(owner.user_id, Some("PIET".into())).await.unwrap().len(), 1);
    assert!(chat.conversations(owner.user_id, Some("toaster".into())).await.unwrap().is_empty());
}
