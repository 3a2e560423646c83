//! Timeslot picking, holding and confirmation tests.

use chrono::{Duration, NaiveTime, TimeZone, Timelike, Utc};
use uuid::Uuid;

use db::models::RepairStatus;
use db::Store;
use realtime::ChangeFilter;

use crate::booking::{plan_instants, TimeslotPlan};
use crate::test_support::Harness;
use crate::MatchingError;

#[tokio::test]
async fn dates_and_day_listing_only_show_open_slots() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let day = (Utc::now() + Duration::days(3)).date_naive();
    let at = |hour| Utc.from_utc_datetime(&day.and_time(NaiveTime::from_hms_opt(hour, 0, 0).unwrap()));
    let late = h.slot_at(&cafe, at(16), 2).await;
    let early = h.slot_at(&cafe, at(10), 2).await;
    let full = h.slot_at(&cafe, at(12), 1).await;

    let owner = h.user("Jan", "jan@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    h.services.booking.submit_selection(owner.user_id, repair, &[full.timeslot_id]).await.unwrap();

    let dates = h.services.booking.available_dates(None).await.unwrap();
    assert_eq!(dates, vec![day]);
    assert!(h.services.booking.available_dates(Some(Uuid::new_v4())).await.unwrap().is_empty());

    let slots = h.services.booking.timeslots_for_day(day, Some(cafe.location_id)).await.unwrap();
    let ids: Vec<Uuid> = slots.iter().map(|s| s.timeslot.timeslot_id).collect();
    assert_eq!(ids, vec![early.timeslot_id, late.timeslot_id]);
    assert_eq!(slots[0].location_name, "Repair Café");
    assert_eq!(slots[0].spots_available, 2);
}

#[tokio::test]
async fn holding_takes_a_spot_and_publishes() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let slot = h.slot(&cafe, 48, 2).await;
    let owner = h.user("Jan", "jan@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let mut feed = h.services.changes.subscribe(ChangeFilter::table("timeslots"));

    let holds = h
        .services
        .booking
        .submit_selection(owner.user_id, repair, &[slot.timeslot_id])
        .await
        .unwrap();
    assert_eq!(holds.len(), 1);
    assert!(!holds[0].is_confirmed);

    let event = feed.recv().await.unwrap();
    assert_eq!(event.record["spots_taken"], 1);
    assert_eq!(h.store.get_timeslot(slot.timeslot_id).await.unwrap().spots_taken, 1);
}

#[tokio::test]
async fn selection_rules_are_enforced() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let owner = h.user("Jan", "jan@example.be").await;
    let other = h.user("Mia", "mia@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let mut ids = Vec::new();
    for hours in 1..=6 {
        ids.push(h.slot(&cafe, hours * 24, 3).await.timeslot_id);
    }
    let booking = &h.services.booking;

    let err = booking.submit_selection(owner.user_id, repair, &ids).await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "timeslot_ids", .. }));
    let err = booking.submit_selection(owner.user_id, repair, &[]).await.unwrap_err();
    assert!(matches!(err, MatchingError::Validation { .. }));
    let err = booking.submit_selection(other.user_id, repair, &ids[..1]).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));
    let err = booking.submit_selection(owner.user_id, repair, &[Uuid::new_v4()]).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound("timeslot")));

    booking.submit_selection(owner.user_id, repair, &ids[..2]).await.unwrap();
    let err = booking.submit_selection(owner.user_id, repair, &ids[1..3]).await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    assert_eq!(h.store.list_repair_timeslots(repair).await.unwrap().len(), 2);
}

#[tokio::test]
async fn a_full_slot_rejects_the_whole_selection() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let open = h.slot(&cafe, 24, 3).await;
    let single = h.slot(&cafe, 26, 1).await;
    let first = h.user("Jan", "jan@example.be").await;
    let second = h.user("Mia", "mia@example.be").await;
    let first_repair = h.request(&first, "Radio").await.request.repair_id;
    let second_repair = h.request(&second, "Laptop").await.request.repair_id;
    let booking = &h.services.booking;

    booking.submit_selection(first.user_id, first_repair, &[single.timeslot_id]).await.unwrap();
    let err = booking
        .submit_selection(second.user_id, second_repair, &[open.timeslot_id, single.timeslot_id])
        .await
        .unwrap_err();
    assert!(
        matches!(err, MatchingError::CapacityExhausted { timeslot_id } if timeslot_id == single.timeslot_id)
    );
    assert_eq!(h.store.get_timeslot(open.timeslot_id).await.unwrap().spots_taken, 0);
    assert!(h.store.list_repair_timeslots(second_repair).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_holds_never_overbook() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let slot = h.slot(&cafe, 24, 2).await;
    let mut tasks = Vec::new();
    for i in 0..6 {
        let user = h.user("Jan", &format!("jan{i}@example.be")).await;
        let repair = h.request(&user, "Radio").await.request.repair_id;
        let booking = h.services.booking.clone();
        let id = slot.timeslot_id;
        tasks.push(tokio::spawn(async move {
            booking.submit_selection(user.user_id, repair, &[id]).await
        }));
    }
    let mut booked = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => booked += 1,
            Err(err) => assert!(matches!(err, MatchingError::CapacityExhausted { .. })),
        }
    }
    assert_eq!(booked, 2);
    let after = h.store.get_timeslot(slot.timeslot_id).await.unwrap();
    assert_eq!(after.spots_taken, 2);
    assert!(!after.available);
}

#[tokio::test]
async fn repairer_confirms_one_slot_and_the_rest_are_released() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let a = h.slot(&cafe, 24, 3).await;
    let b = h.slot(&cafe, 48, 3).await;
    let owner = h.repairer("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let booking = &h.services.booking;
    booking
        .submit_selection(owner.user_id, repair, &[a.timeslot_id, b.timeslot_id])
        .await
        .unwrap();

    let view = booking.repair_timeslots_for_repairer(repairer.user_id, repair).await.unwrap();
    assert_eq!(view.timeslots.len(), 2);
    assert_eq!(view.timeslots[0].timeslot_id, a.timeslot_id);
    assert_eq!(view.location.unwrap().name, "Repair Café");

    let err = booking.confirm(owner.user_id, repair, b.timeslot_id).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));

    let confirmation = booking.confirm(repairer.user_id, repair, b.timeslot_id).await.unwrap();
    assert_eq!(confirmation.request.status, "scheduled");
    assert_eq!(confirmation.released, 1);
    assert_eq!(confirmation.location.location_id, cafe.location_id);
    assert_eq!(h.store.get_timeslot(a.timeslot_id).await.unwrap().spots_taken, 0);

    let err = booking.confirm(repairer.user_id, repair, b.timeslot_id).await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    let err = booking.withdraw(owner.user_id, repair, b.timeslot_id).await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    let err = booking.submit_selection(owner.user_id, repair, &[a.timeslot_id]).await.unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
}

#[tokio::test]
async fn withdrawing_frees_the_spot() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let slot = h.slot(&cafe, 24, 1).await;
    let owner = h.user("Jan", "jan@example.be").await;
    let other = h.user("Mia", "mia@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    let booking = &h.services.booking;
    booking.submit_selection(owner.user_id, repair, &[slot.timeslot_id]).await.unwrap();

    let err = booking.withdraw(other.user_id, repair, slot.timeslot_id).await.unwrap_err();
    assert!(matches!(err, MatchingError::Forbidden(_)));

    let freed = booking.withdraw(owner.user_id, repair, slot.timeslot_id).await.unwrap();
    assert_eq!(freed.spots_taken, 0);
    assert!(freed.available);
    let err = booking.withdraw(owner.user_id, repair, slot.timeslot_id).await.unwrap_err();
    assert!(matches!(err, MatchingError::NotFound("timeslot hold")));
}

#[test]
fn selection_toggles_and_resets() {
    let h = Harness::new();
    let mut selection = h.services.booking.new_selection();
    let ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();

    assert!(selection.toggle(ids[0]).unwrap());
    assert!(!selection.toggle(ids[0]).unwrap());
    for id in &ids[..5] {
        selection.toggle(*id).unwrap();
    }
    assert!(selection.toggle(ids[5]).is_err());
    assert_eq!(selection.ids(), &ids[..5]);

    selection.set_location(Some(Uuid::new_v4()));
    assert!(selection.ids().is_empty());
    selection.toggle(ids[0]).unwrap();
    selection.set_date(Utc::now().date_naive());
    assert!(selection.ids().is_empty());
}

#[test]
fn plan_covers_weekdays_from_the_start_instant() {
    // Monday morning, one week.
    let start = Utc.with_ymd_and_hms(2025, 3, 17, 9, 0, 0).unwrap();
    let instants = plan_instants(&TimeslotPlan { start, days: 7, capacity: 3 });
    assert_eq!(instants.len(), 25);
    assert_eq!(instants[0], Utc.with_ymd_and_hms(2025, 3, 17, 10, 0, 0).unwrap());
    assert_eq!(instants[24], Utc.with_ymd_and_hms(2025, 3, 21, 18, 0, 0).unwrap());

    let late = Utc.with_ymd_and_hms(2025, 3, 17, 11, 0, 0).unwrap();
    assert_eq!(plan_instants(&TimeslotPlan { start: late, days: 7, capacity: 3 }).len(), 24);
}

#[tokio::test]
async fn generated_slots_split_mornings_and_afternoons() {
    let h = Harness::new();
    let first = h.location("A Repair Café").await;
    let second = h.location("B Makerspace").await;
    // A Saturday and Sunday, then Monday.
    let start = Utc.with_ymd_and_hms(2025, 3, 15, 0, 0, 0).unwrap();

    let created = h
        .services
        .booking
        .generate_timeslots(TimeslotPlan { start, days: 3, capacity: 4 })
        .await
        .unwrap();
    assert_eq!(created.len(), 5);
    for slot in &created {
        let expected = if slot.date_time.hour() < 14 { &first } else { &second };
        assert_eq!(slot.location_id, expected.location_id);
        assert_eq!(slot.capacity, 4);
    }

    let err = h
        .services
        .booking
        .generate_timeslots(TimeslotPlan { start, days: 3, capacity: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Validation { field: "capacity", .. }));
}

#[tokio::test]
async fn seeding_locations_happens_once() {
    let h = Harness::new();
    let seeded = h.services.booking.seed_locations().await.unwrap();
    let names: Vec<&str> = seeded.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Community Center", "Repair Café"]);
    assert_eq!(
        seeded[0].google_maps_link.as_deref(),
        Some("https://maps.google.com/?q=Naamsestraat+96+3000+Leuven")
    );

    let again = h.services.booking.seed_locations().await.unwrap();
    assert_eq!(again.len(), 2);
    assert_eq!(again[0].location_id, seeded[0].location_id);
}

#[tokio::test]
async fn cancelled_request_frees_its_slots_and_cannot_be_scheduled() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let slot = h.slot(&cafe, 48, 1).await;
    let owner = h.user("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    h.services.booking.submit_selection(owner.user_id, repair, &[slot.timeslot_id]).await.unwrap();
    let mut feed = h.services.changes.subscribe(ChangeFilter::table("timeslots"));

    h.services
        .requests
        .update_status(owner.user_id, repair, RepairStatus::Cancelled)
        .await
        .unwrap();
    let freed = h.store.get_timeslot(slot.timeslot_id).await.unwrap();
    assert_eq!(freed.spots_taken, 0);
    assert!(freed.available);
    assert_eq!(feed.recv().await.unwrap().record["spots_taken"], 0);

    let err = h
        .services
        .booking
        .confirm(repairer.user_id, repair, slot.timeslot_id)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    let err = h
        .services
        .booking
        .repair_timeslots_for_repairer(repairer.user_id, repair)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    assert_eq!(h.store.get_repair_request(repair).await.unwrap().status, "cancelled");

    let other = h.user("Mia", "mia@example.be").await;
    let other_repair = h.request(&other, "Laptop").await.request.repair_id;
    h.services
        .booking
        .submit_selection(other.user_id, other_repair, &[slot.timeslot_id])
        .await
        .unwrap();
}

#[tokio::test]
async fn completed_request_keeps_its_status_on_confirm() {
    let h = Harness::new();
    let cafe = h.location("Repair Café").await;
    let slot = h.slot(&cafe, 48, 2).await;
    let owner = h.user("Jan", "jan@example.be").await;
    let repairer = h.repairer("Piet", "piet@example.be").await;
    let repair = h.request(&owner, "Radio").await.request.repair_id;
    h.services.booking.submit_selection(owner.user_id, repair, &[slot.timeslot_id]).await.unwrap();
    for status in [RepairStatus::Accepted, RepairStatus::Completed] {
        h.services.requests.update_status(repairer.user_id, repair, status).await.unwrap();
    }

    let err = h
        .services
        .booking
        .confirm(repairer.user_id, repair, slot.timeslot_id)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchingError::Conflict(_)));
    assert_eq!(h.store.get_repair_request(repair).await.unwrap().status, "completed");
}
