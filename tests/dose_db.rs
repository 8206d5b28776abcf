mod common;

use common::{at, date, slot};
use dosekeeper::core::schedule;
use dosekeeper::db::{Database, DoseFilter};
use dosekeeper::models::dose::{DoseEvent, DoseStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn seed(db: &Database, user: &str, name: &str) -> (String, Vec<DoseEvent>) {
    let med = common::make_medicine(user, name, date(2025, 1, 1), vec![slot(8, 0), slot(20, 0)], 4);
    let events = schedule::generate(&med);
    db.insert_medicine_with_schedule(&med, &events).unwrap();
    (med.id, events)
}

// ---------------------------------------------------------------------------
// Medicines
// ---------------------------------------------------------------------------

#[test]
fn medicine_roundtrip_keeps_every_field() {
    let (_dir, db) = common::setup_db();
    let mut med = common::make_medicine("u1", "metformin", date(2025, 3, 1), vec![slot(20, 0), slot(8, 0)], 60);
    med.dosage = Some("500mg".into());
    med.frequency = "weekdays:mon,thu".parse().unwrap();
    db.insert_medicine(&med).unwrap();

    let got = db.get_medicine(&med.id).unwrap().unwrap();
    assert_eq!(got.name, "metformin");
    assert_eq!(got.user_id, "u1");
    assert_eq!(got.dosage.as_deref(), Some("500mg"));
    assert_eq!(got.frequency, med.frequency);
    assert_eq!(got.start_date, date(2025, 3, 1));
    assert_eq!(got.time_slots, vec![slot(8, 0), slot(20, 0)]);
    assert_eq!(got.total_quantity, 60);
    assert!(got.active);
    assert!(got.reminders_enabled);
    assert!(got.stopped_at.is_none());
}

#[test]
fn find_medicine_by_name_is_scoped_to_user() {
    let (_dir, db) = common::setup_db();
    let (id, _) = seed(&db, "u1", "aspirin");

    assert_eq!(db.find_medicine("u1", "aspirin").unwrap().unwrap().id, id);
    assert_eq!(db.find_medicine("u1", &id).unwrap().unwrap().id, id);
    assert!(db.find_medicine("u2", "aspirin").unwrap().is_none());
    assert!(db.find_medicine("u2", &id).unwrap().is_none());
}

#[test]
fn second_active_medicine_with_same_name_is_rejected() {
    let (_dir, db) = common::setup_db();
    seed(&db, "u1", "aspirin");
    let dup = common::make_medicine("u1", "aspirin", date(2025, 1, 1), vec![slot(9, 0)], 1);
    assert!(db.insert_medicine(&dup).is_err());

    let other_user = common::make_medicine("u2", "aspirin", date(2025, 1, 1), vec![slot(9, 0)], 1);
    db.insert_medicine(&other_user).unwrap();
}

#[test]
fn remove_medicine_cascades_to_doses() {
    let (_dir, db) = common::setup_db();
    let (id, events) = seed(&db, "u1", "aspirin");

    assert!(db.remove_medicine(&id).unwrap());
    assert!(db.get_medicine(&id).unwrap().is_none());
    for e in &events {
        assert!(db.get_dose_event(&e.id).unwrap().is_none());
    }
    assert!(!db.remove_medicine(&id).unwrap());
}

#[test]
fn stop_medicine_drops_future_open_doses_and_keeps_history() {
    let (_dir, db) = common::setup_db();
    let (id, events) = seed(&db, "u1", "aspirin");
    // 2025-01-01 08:00 taken, 20:00 left pending in the past
    db.compare_and_set_status(&events[0].id, DoseStatus::Pending, DoseStatus::Taken, Some(at(2025, 1, 1, 8, 5)))
        .unwrap();

    assert!(db.stop_medicine(&id, at(2025, 1, 2, 0, 0)).unwrap());
    assert!(!db.stop_medicine(&id, at(2025, 1, 2, 0, 0)).unwrap());

    let left = db
        .list_dose_events(&DoseFilter {
            medicine_id: Some(id.clone()),
            ..DoseFilter::default()
        })
        .unwrap();
    assert_eq!(left.len(), 2);
    assert_eq!(left[0].status, DoseStatus::Taken);
    assert_eq!(left[1].status, DoseStatus::Pending);

    let med = db.get_medicine(&id).unwrap().unwrap();
    assert!(!med.active);
    assert_eq!(med.stopped_at, Some(at(2025, 1, 2, 0, 0)));
}

// ---------------------------------------------------------------------------
// Dose events
// ---------------------------------------------------------------------------

#[test]
fn dose_roundtrip_and_listing_order() {
    let (_dir, db) = common::setup_db();
    let (id, events) = seed(&db, "u1", "aspirin");

    let got = db.get_dose_event(&events[1].id).unwrap().unwrap();
    assert_eq!(got, events[1]);
    assert_eq!(got.scheduled_at, at(2025, 1, 1, 20, 0));
    assert_eq!(got.original_scheduled_at, at(2025, 1, 1, 20, 0));
    assert_eq!(got.status, DoseStatus::Pending);
    assert_eq!(got.snooze_count, 0);

    let all = db
        .list_dose_events(&DoseFilter {
            user_id: Some("u1".into()),
            medicine_id: Some(id),
            ..DoseFilter::default()
        })
        .unwrap();
    let times: Vec<_> = all.iter().map(|e| e.scheduled_at).collect();
    assert_eq!(
        times,
        vec![
            at(2025, 1, 1, 8, 0),
            at(2025, 1, 1, 20, 0),
            at(2025, 1, 2, 8, 0),
            at(2025, 1, 2, 20, 0),
        ]
    );
}

#[test]
fn list_filters_by_status_range_and_limit() {
    let (_dir, db) = common::setup_db();
    let (_, events) = seed(&db, "u1", "aspirin");
    db.compare_and_set_status(&events[2].id, DoseStatus::Pending, DoseStatus::Missed, None)
        .unwrap();

    let missed = db
        .list_dose_events(&DoseFilter {
            status: Some(DoseStatus::Missed),
            ..DoseFilter::default()
        })
        .unwrap();
    assert_eq!(missed.len(), 1);
    assert_eq!(missed[0].id, events[2].id);

    let day_two = db
        .list_dose_events(&DoseFilter {
            from: Some(at(2025, 1, 2, 0, 0)),
            to: Some(at(2025, 1, 2, 23, 59)),
            ..DoseFilter::default()
        })
        .unwrap();
    assert_eq!(day_two.len(), 2);

    let first = db
        .list_dose_events(&DoseFilter {
            limit: Some(1),
            ..DoseFilter::default()
        })
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].id, events[0].id);
}

#[test]
fn original_slot_is_unique_per_medicine() {
    let (_dir, db) = common::setup_db();
    let (id, _) = seed(&db, "u1", "aspirin");
    let dup = DoseEvent::new(id, at(2025, 1, 1, 8, 0));
    assert!(db.create_dose_events(&[dup]).is_err());
}

#[test]
fn pending_due_window_is_inclusive() {
    let (_dir, db) = common::setup_db();
    let (_, events) = seed(&db, "u1", "aspirin");

    let due = db
        .find_pending_due("u1", at(2025, 1, 1, 7, 59), at(2025, 1, 1, 8, 0))
        .unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].id, events[0].id);

    let due = db
        .find_pending_due("u1", at(2025, 1, 1, 8, 0), at(2025, 1, 1, 8, 1))
        .unwrap();
    assert_eq!(due.len(), 1);

    let none = db
        .find_pending_due("u1", at(2025, 1, 1, 8, 1), at(2025, 1, 1, 8, 2))
        .unwrap();
    assert!(none.is_empty());

    assert!(
        db.find_pending_due("u2", at(2025, 1, 1, 7, 59), at(2025, 1, 1, 8, 0))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn pending_due_skips_sent_and_stopped() {
    let (_dir, db) = common::setup_db();
    let (id, events) = seed(&db, "u1", "aspirin");
    db.compare_and_set_status(&events[0].id, DoseStatus::Pending, DoseStatus::Sent, None)
        .unwrap();
    assert!(
        db.find_pending_due("u1", at(2025, 1, 1, 7, 0), at(2025, 1, 1, 9, 0))
            .unwrap()
            .is_empty()
    );

    db.stop_medicine(&id, at(2025, 1, 1, 0, 0)).unwrap();
    assert!(
        db.users_with_pending_due(at(2025, 1, 1, 0, 0), at(2025, 1, 3, 0, 0))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn users_with_pending_due_lists_each_user_once() {
    let (_dir, db) = common::setup_db();
    seed(&db, "u2", "aspirin");
    seed(&db, "u1", "aspirin");
    seed(&db, "u1", "ibuprofen");

    let users = db
        .users_with_pending_due(at(2025, 1, 1, 7, 0), at(2025, 1, 1, 9, 0))
        .unwrap();
    assert_eq!(users, vec!["u1".to_string(), "u2".to_string()]);
}

// ---------------------------------------------------------------------------
// Conditional updates
// ---------------------------------------------------------------------------

#[test]
fn compare_and_set_only_moves_the_expected_state() {
    let (_dir, db) = common::setup_db();
    let (_, events) = seed(&db, "u1", "aspirin");
    let id = &events[0].id;

    assert!(db.compare_and_set_status(id, DoseStatus::Pending, DoseStatus::Sent, None).unwrap());
    assert!(!db.compare_and_set_status(id, DoseStatus::Pending, DoseStatus::Sent, None).unwrap());
    assert!(
        db.compare_and_set_status(id, DoseStatus::Sent, DoseStatus::Taken, Some(at(2025, 1, 1, 8, 3)))
            .unwrap()
    );

    let got = db.get_dose_event(id).unwrap().unwrap();
    assert_eq!(got.status, DoseStatus::Taken);
    assert_eq!(got.action_at, Some(at(2025, 1, 1, 8, 3)));
}

#[test]
fn compare_and_set_across_connections_has_one_winner() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("shared.db");
    let poller = Database::open(&path).unwrap();
    let user = Database::open(&path).unwrap();
    let (_, events) = seed(&poller, "u1", "aspirin");
    let id = &events[0].id;

    let took = user
        .compare_and_set_status(id, DoseStatus::Pending, DoseStatus::Taken, Some(at(2025, 1, 1, 8, 0)))
        .unwrap();
    let sent = poller
        .compare_and_set_status(id, DoseStatus::Pending, DoseStatus::Sent, None)
        .unwrap();

    assert!(took);
    assert!(!sent);
    assert_eq!(poller.get_dose_event(id).unwrap().unwrap().status, DoseStatus::Taken);
}

#[test]
fn reschedule_requires_matching_state_and_time() {
    let (_dir, db) = common::setup_db();
    let (_, events) = seed(&db, "u1", "aspirin");
    let id = &events[0].id;
    let due = at(2025, 1, 1, 8, 0);

    assert!(!db.reschedule(id, DoseStatus::Sent, due, at(2025, 1, 1, 8, 10)).unwrap());
    assert!(!db.reschedule(id, DoseStatus::Pending, at(2025, 1, 1, 9, 0), at(2025, 1, 1, 8, 10)).unwrap());
    assert!(db.reschedule(id, DoseStatus::Pending, due, at(2025, 1, 1, 8, 10)).unwrap());

    let got = db.get_dose_event(id).unwrap().unwrap();
    assert_eq!(got.scheduled_at, at(2025, 1, 1, 8, 10));
    assert_eq!(got.original_scheduled_at, due);
    assert_eq!(got.snooze_count, 1);
    assert_eq!(got.status, DoseStatus::Pending);
}

#[test]
fn overdue_lists_only_open_doses_before_cutoff() {
    let (_dir, db) = common::setup_db();
    let (_, events) = seed(&db, "u1", "aspirin");
    db.compare_and_set_status(&events[0].id, DoseStatus::Pending, DoseStatus::Taken, None)
        .unwrap();
    db.compare_and_set_status(&events[1].id, DoseStatus::Pending, DoseStatus::Sent, None)
        .unwrap();

    let overdue = db.find_overdue(at(2025, 1, 2, 8, 0)).unwrap();
    let ids: Vec<_> = overdue.iter().map(|e| e.id.clone()).collect();
    assert_eq!(ids, vec![events[1].id.clone()]);
}

// ---------------------------------------------------------------------------
// Delivery targets
// ---------------------------------------------------------------------------

#[test]
fn delivery_target_upsert_and_remove() {
    let (_dir, db) = common::setup_db();
    assert!(db.get_delivery_target("u1").unwrap().is_none());

    db.set_delivery_target("u1", "tok-a", at(2025, 1, 1, 0, 0)).unwrap();
    db.set_delivery_target("u1", "tok-b", at(2025, 1, 2, 0, 0)).unwrap();
    let t = db.get_delivery_target("u1").unwrap().unwrap();
    assert_eq!(t.token, "tok-b");
    assert_eq!(t.updated_at, at(2025, 1, 2, 0, 0));

    assert!(db.remove_delivery_target("u1").unwrap());
    assert!(!db.remove_delivery_target("u1").unwrap());
    assert!(db.get_delivery_target("u1").unwrap().is_none());
}
