//! Repair request, profile and demo data tests.

use db::models::RepairStatus;
use realtime::ChangeFilter;

use crate::requests::{BrowseQuery, BrowseStatus, ProfileInput, RepairRequestInput, RequestQuery};
use crate::settings::DemoSettings;
use crate::test_support::Harness;
use crate::{MatchingError, Settings};

fn input(device_type: &str, description: &str) -> RepairRequestInput {
    RepairRequestInput {
        device_type: device_type.into(),
        brand: Some("  ".into()),
        model: None,
        description: description.into(),
    }
}

#[tokio::test]
async fn creating_a_request_registers_a_broken_product() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let mut feed = h.services.changes.subscribe(ChangeFilter::table("repair_requests"));

    let view = h
        .services
        .requests
        .create_repair_request(
            owner.user_id,
            input("coffee machine", "  The water tank leaks all over the counter.  "),
        )
        .await
        .unwrap();

    assert_eq!(view.request.status, "pending");
    assert_eq!(view.request.description, "The water tank leaks all over the counter.");
    assert_eq!(view.product.product_type, "Coffee machine");
    assert_eq!(view.product.status, "broken");
    assert_eq!(view.product.brand, None);
    assert_eq!(view.created_label, "Today");
    assert_eq!(feed.recv().await.unwrap().column("repair_id"), Some(view.request.repair_id.to_string()));

    let products = h.services.requests.list_products(owner.user_id).await.unwrap();
    assert_eq!(products.len(), 1);
}

#[tokio::test]
async fn request_form_is_validated() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let requests = &h.services.requests;

    let err = requests
        .create_repair_request(owner.user_id, input("Toaster", "Burns everything it touches, always."))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "device_type", .. }));

    let err = requests
        .create_repair_request(owner.user_id, input("Radio", "Broken."))
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "description", .. }));
}

#[tokio::test]
async fn own_list_filters_by_tab_and_search() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let radio = h.request(&owner, "Radio").await;
    let laptop = h.request(&owner, "Laptop").await;
    h.services
        .requests
        .update_status(repairer.user_id, laptop.request.repair_id, RepairStatus::Accepted)
        .await
        .unwrap();

    let requests = &h.services.requests;
    let all = requests.list_own_requests(owner.user_id, RequestQuery::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].request.repair_id, laptop.request.repair_id);

    let pending = requests
        .list_own_requests(
            owner.user_id,
            RequestQuery { tab: Some("pending".into()), search: None },
        )
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].request.repair_id, radio.request.repair_id);

    let searched = requests
        .list_own_requests(owner.user_id, RequestQuery { tab: None, search: Some("LAPTOP".into()) })
        .await
        .unwrap();
    assert_eq!(searched.len(), 1);

    let err = requests
        .list_own_requests(owner.user_id, RequestQuery { tab: Some("lost".into()), search: None })
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "tab", .. }));
}

#[tokio::test]
async fn browsing_is_for_repairers_and_hides_their_own_requests() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let theirs = h.request(&owner, "Radio").await;
    h.request(&repairer, "Laptop").await;

    let requests = &h.services.requests;
    let err = requests.browse_requests(owner.user_id, BrowseQuery::default()).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));

    let seen = requests.browse_requests(repairer.user_id, BrowseQuery::default()).await.unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].request.repair_id, theirs.request.repair_id);

    let in_progress = requests
        .browse_requests(
            repairer.user_id,
            BrowseQuery { status: BrowseStatus::InProgress, ..BrowseQuery::default() },
        )
        .await
        .unwrap();
    assert!(in_progress.is_empty());

    let by_type = requests
        .browse_requests(
            repairer.user_id,
            BrowseQuery { device_type: Some("Laptop".into()), ..BrowseQuery::default() },
        )
        .await
        .unwrap();
    assert!(by_type.is_empty());
}

#[tokio::test]
async fn status_changes_follow_roles() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let bystander = h.user("Mia", "mia@example.be").await;
    let id = h.request(&owner, "Radio").await.request.repair_id;
    let requests = &h.services.requests;

    let err = requests.update_status(owner.user_id, id, RepairStatus::Accepted).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));
    let err = requests
        .update_status(bystander.user_id, id, RepairStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));
    let err = requests
        .update_status(repairer.user_id, id, RepairStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));

    requests.update_status(repairer.user_id, id, RepairStatus::Accepted).await.unwrap();
    requests.update_status(owner.user_id, id, RepairStatus::Cancelled).await.unwrap();
    let err = requests.update_status(owner.user_id, id, RepairStatus::Cancelled).await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
}

#[tokio::test]
async fn details_are_private_to_owner_and_repairers() {
    let h = Harness::new();
    let owner = h.user("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let bystander = h.user("Mia", "mia@example.be").await;
    let id = h.request(&owner, "Radio").await.request.repair_id;
    let requests = &h.services.requests;

    assert!(requests.get_request_details(owner.user_id, id).await.is_ok());
    assert!(requests.get_request_details(repairer.user_id, id).await.is_ok());
    let err = requests.get_request_details(bystander.user_id, id).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));
    let err = requests.get_request_details(owner.user_id, uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound("repair request")));
}

#[tokio::test]
async fn profile_number_must_be_an_integer() {
    let h = Harness::new();
    let user = h.user("Jan", "jan@example.be").await;
    let mut form = ProfileInput {
        first_name: "Jan".into(),
        last_name: "Peeters".into(),
        street: "Bondgenotenlaan".into(),
        number: "12b".into(),
        postal_code: "3000".into(),
        city: "Leuven".into(),
        phone_number: Some(" ".into()),
        receive_requests: true,
    };
    let err = h.services.requests.update_profile(user.user_id, form.clone()).await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "number", .. }));

    form.number = "12".into();
    let view = h.services.requests.update_profile(user.user_id, form).await.unwrap();
    assert_eq!(view.profile.number, Some(12));
    assert_eq!(view.profile.phone_number, None);
    assert!(view.profile.receive_requests);
    assert_eq!(view.email, "jan@example.be");
}

#[tokio::test]
async fn demo_data_adds_three_requests_a_day_apart() {
    let h = Harness::new();
    let user = h.user("Jan", "jan@example.be").await;
    let added = h.services.demo.populate(user.user_id).await.unwrap();

    let labels: Vec<&str> = added.iter().map(|v| v.created_label.as_str()).collect();
    assert_eq!(labels, ["Today", "Yesterday", "2 days ago"]);
    let statuses: Vec<&str> = added.iter().map(|v| v.request.status.as_str()).collect();
    assert_eq!(statuses, ["pending", "accepted", "pending"]);

    let own = h
        .services
        .requests
        .list_own_requests(user.user_id, RequestQuery::default())
        .await
        .unwrap();
    assert_eq!(own[0].product.product_type, "Coffee machine");
    assert_eq!(own[2].product.product_type, "Radio");
}

#[tokio::test]
async fn demo_data_can_be_disabled() {
    let h = Harness::with_settings(Settings {
        demo: DemoSettings { enabled: false },
        ..Settings::default()
    });
    let user = h.user("Jan", "jan@example.be").await;
    assert!(matches!(
        h.services.demo.populate(user.user_id).await,
        Err(MatchingError::Forbidden(_))
    ));
}
