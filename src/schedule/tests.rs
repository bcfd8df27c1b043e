use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;

use super::*;
use crate::db::fixtures::{self, date, MONDAY, SHOP_A, SHOP_B, TUESDAY};
use crate::db::Database;
use crate::models::BookingChannel;

fn engine() -> BookingEngine<Database> {
    BookingEngine::new(fixtures::salon(), EngineConfig::default())
}

fn engine_with_step(step: u32) -> BookingEngine<Database> {
    BookingEngine::new(
        fixtures::salon(),
        EngineConfig {
            slot_step_minutes: step,
            ..EngineConfig::default()
        },
    )
}

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn query(day: &str, services: &[&str], staff: Option<&str>) -> SlotQuery {
    SlotQuery {
        date: date(day),
        service_ids: ids(services),
        staff_id: staff.map(str::to_string),
    }
}

fn request(services: &[&str], staff: Option<&str>, start: &str) -> NewBooking {
    NewBooking {
        customer_id: "cust-1".into(),
        service_ids: ids(services),
        staff_id: staff.map(str::to_string),
        date: date(MONDAY),
        start_time: start.parse().unwrap(),
        notes: None,
        channel: BookingChannel::Online,
    }
}

fn book(engine: &BookingEngine<Database>, services: &[&str], staff: &str, start: &str) -> Booking {
    engine
        .create_booking(SHOP_A, request(services, Some(staff), start))
        .unwrap()
}

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl BookingNotifier for RecordingNotifier {
    fn booking_created(&self, booking: &Booking) {
        self.record(format!("created {}", booking.id));
    }
    fn booking_updated(&self, booking: &Booking) {
        self.record(format!("updated {}", booking.id));
    }
    fn booking_status_changed(&self, booking: &Booking, previous: BookingStatus) {
        self.record(format!("status {} {}->{}", booking.id, previous, booking.status));
    }
    fn booking_cancelled(&self, booking: &Booking) {
        self.record(format!("cancelled {}", booking.id));
    }
}

// ==================== Availability ====================

#[test]
fn test_slots_cover_empty_shift() {
    let engine = engine();
    let result = engine
        .available_slots(SHOP_A, &query(MONDAY, &["cut"], Some("ana")))
        .unwrap();

    assert_eq!(result.duration_minutes, 30);
    assert_eq!(result.slots.first().map(String::as_str), Some("09:00"));
    assert_eq!(result.slots.last().map(String::as_str), Some("16:30"));
    assert_eq!(result.slots.len(), 16);
    assert!(result
        .slots
        .iter()
        .all(|s| s.as_str() >= "09:00" && s.as_str() < "17:00"));
}

#[test]
fn test_slots_fifteen_minute_scenario() {
    let engine = engine_with_step(15);
    book(&engine, &["cut"], "ben", "10:00");

    let result = engine
        .available_slots(SHOP_A, &query(MONDAY, &["style"], Some("ben")))
        .unwrap();
    assert_eq!(result.slots, vec!["10:30", "10:45", "11:00", "11:15"]);
}

#[test]
fn test_slots_merge_across_staff() {
    let engine = engine();
    for start in ["09:00", "10:00", "11:00"] {
        book(&engine, &["color"], "ana", start);
    }

    let result = engine
        .available_slots(SHOP_A, &query(MONDAY, &["cut"], None))
        .unwrap();

    // Ana is busy until noon, Ben covers 10:00-12:00, Cleo is inactive
    assert!(!result.slots.contains(&"08:00".to_string()));
    assert!(!result.slots.contains(&"09:00".to_string()));
    assert!(result.slots.contains(&"10:00".to_string()));
    assert!(result.slots.contains(&"11:30".to_string()));
    assert!(result.slots.contains(&"12:00".to_string()));

    let mut sorted = result.slots.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted, result.slots);
}

#[test]
fn test_slots_skip_staff_not_working() {
    let engine = engine();
    let tuesday = engine
        .available_slots(SHOP_A, &query(TUESDAY, &["cut"], Some("ben")))
        .unwrap();
    assert!(tuesday.slots.is_empty());

    // 2026-03-01 is a Sunday: nobody works
    let sunday = engine
        .available_slots(SHOP_A, &query("2026-03-01", &["cut"], None))
        .unwrap();
    assert!(sunday.slots.is_empty());
}

#[test]
fn test_slots_edge_inputs() {
    let engine = engine();

    let none = engine
        .available_slots(SHOP_A, &query(MONDAY, &[], None))
        .unwrap();
    assert!(none.slots.is_empty());

    let unknown_staff = engine
        .available_slots(SHOP_A, &query(MONDAY, &["cut"], Some("ghost")))
        .unwrap();
    assert!(unknown_staff.slots.is_empty());

    // Another shop's staff is invisible
    let foreign = engine
        .available_slots(SHOP_A, &query(MONDAY, &["cut"], Some("dana")))
        .unwrap();
    assert!(foreign.slots.is_empty());

    let err = engine
        .available_slots(SHOP_A, &query(MONDAY, &["cut", "perm"], None))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::ServiceNotFound(ref s) if s == "perm"));
}

#[test]
fn test_slots_shift_shorter_than_services() {
    let engine = engine();
    // 2h15 of work does not fit Ben's two-hour shift
    let result = engine
        .available_slots(SHOP_A, &query(MONDAY, &["cut", "color", "style"], Some("ben")))
        .unwrap();
    assert_eq!(result.duration_minutes, 135);
    assert!(result.slots.is_empty());
}

#[test]
fn test_every_listed_slot_can_be_booked() {
    let setup = || {
        let engine = engine();
        book(&engine, &["color"], "ana", "12:00");
        engine
    };

    let listed = setup()
        .available_slots(SHOP_A, &query(MONDAY, &["style"], Some("ana")))
        .unwrap()
        .slots;
    assert!(!listed.is_empty());
    assert!(!listed.contains(&"11:30".to_string()));

    for start in listed {
        let engine = setup();
        engine
            .create_booking(SHOP_A, request(&["style"], Some("ana"), &start))
            .unwrap_or_else(|e| panic!("slot {start} rejected: {e}"));
    }
}

// ==================== Creation ====================

#[test]
fn test_create_computes_totals() {
    let engine = engine();
    let booking = book(&engine, &["cut", "color"], "ana", "09:30");

    assert_eq!(booking.total_duration_minutes, 90);
    assert_eq!(booking.total_price, Decimal::new(10500, 2));
    assert_eq!(booking.end_time.to_string(), "11:00");
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert!(booking.booking_code.starts_with("BK-"));
    assert_eq!(booking.service_ids, vec!["cut", "color"]);

    let stored = engine.get_booking(SHOP_A, &booking.id).unwrap();
    assert_eq!(stored.end_time, booking.end_time);
}

#[test]
fn test_service_totals_reject_overflowing_durations() {
    let service = |id: &str, minutes: u32| Service {
        id: id.into(),
        shop_id: SHOP_A.into(),
        name: id.into(),
        duration_minutes: minutes,
        price: Decimal::new(1000, 2),
    };

    let err = ServiceTotals::sum(&[service("huge-a", u32::MAX), service("huge-b", 31)]).unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));

    let totals = ServiceTotals::sum(&[service("a", 30), service("b", 45)]).unwrap();
    assert_eq!(totals.duration_minutes, 75);
    assert_eq!(totals.price, Decimal::new(2000, 2));
}

#[test]
fn test_day_long_service_is_not_stored() {
    let engine = engine();
    let result = engine.store().upsert_service(&Service {
        id: "marathon".into(),
        shop_id: SHOP_A.into(),
        name: "Marathon".into(),
        duration_minutes: 24 * 60,
        price: Decimal::new(100, 0),
    });
    assert!(result.is_err());
    assert!(matches!(
        engine.resolve_services(SHOP_A, &["marathon".to_string()]),
        Err(SchedulingError::ServiceNotFound(_))
    ));
}

#[test]
fn test_staff_channel_booking_is_pending() {
    let engine = engine();
    let mut req = request(&["cut"], Some("ana"), "09:00");
    req.channel = BookingChannel::Staff;
    let booking = engine.create_booking(SHOP_A, req).unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
}

#[test]
fn test_conflict_and_boundary() {
    let engine = engine();
    book(&engine, &["color"], "ana", "09:00");

    let err = engine
        .create_booking(SHOP_A, request(&["cut"], Some("ana"), "09:30"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::StaffUnavailable(_)));

    // Touching the end of the existing booking is allowed
    engine
        .create_booking(SHOP_A, request(&["cut"], Some("ana"), "10:00"))
        .unwrap();
}

#[test]
fn test_cancellation_frees_slot() {
    let engine = engine();
    let existing = book(&engine, &["color"], "ana", "09:00");
    assert!(engine
        .create_booking(SHOP_A, request(&["cut"], Some("ana"), "09:30"))
        .is_err());

    let cancelled = engine.cancel(SHOP_A, &existing.id).unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    engine
        .create_booking(SHOP_A, request(&["cut"], Some("ana"), "09:30"))
        .unwrap();

    // The cancelled record is kept
    let kept = engine.get_booking(SHOP_A, &existing.id).unwrap();
    assert_eq!(kept.status, BookingStatus::Cancelled);
}

#[test]
fn test_no_show_frees_slot() {
    let engine = engine();
    let existing = book(&engine, &["color"], "ana", "09:00");
    engine
        .transition(SHOP_A, &existing.id, BookingStatus::NoShow)
        .unwrap();
    engine
        .create_booking(SHOP_A, request(&["cut"], Some("ana"), "09:00"))
        .unwrap();
}

#[test]
fn test_outside_shift_is_rejected() {
    let engine = engine();
    for start in ["08:30", "16:45"] {
        let err = engine
            .create_booking(SHOP_A, request(&["cut"], Some("ana"), start))
            .unwrap_err();
        assert!(matches!(err, SchedulingError::StaffUnavailable(_)), "{start}");
    }

    let mut tuesday = request(&["cut"], Some("ben"), "10:00");
    tuesday.date = date(TUESDAY);
    assert!(matches!(
        engine.create_booking(SHOP_A, tuesday).unwrap_err(),
        SchedulingError::StaffUnavailable(_)
    ));
}

#[test]
fn test_midnight_crossing_is_rejected() {
    let engine = engine();
    let err = engine
        .create_booking(SHOP_A, request(&["color"], Some("ana"), "23:30"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::CrossesMidnight { .. }));
}

#[test]
fn test_unknown_references() {
    let engine = engine();

    let err = engine
        .create_booking(SHOP_A, request(&["perm"], Some("ana"), "09:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::ServiceNotFound(_)));

    let err = engine
        .create_booking(SHOP_A, request(&["cut"], Some("dana"), "09:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotFound(_)));

    let err = engine
        .create_booking(SHOP_A, request(&["cut"], Some("cleo"), "09:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::NotFound(_)));

    let mut foreign_customer = request(&["cut"], Some("ana"), "09:00");
    foreign_customer.customer_id = "cust-b".into();
    let err = engine.create_booking(SHOP_A, foreign_customer).unwrap_err();
    assert!(matches!(err, SchedulingError::NotFound(_)));

    let err = engine
        .create_booking(SHOP_A, request(&[], Some("ana"), "09:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::Validation(_)));
}

#[test]
fn test_staff_required_policy() {
    let engine = BookingEngine::new(
        fixtures::salon(),
        EngineConfig {
            staff_policy: StaffPolicy::Required,
            ..EngineConfig::default()
        },
    );
    let err = engine
        .create_booking(SHOP_A, request(&["cut"], None, "10:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::StaffRequired));
}

#[test]
fn test_auto_assign_picks_free_staff() {
    let engine = engine();
    book(&engine, &["color"], "ana", "10:00");

    let booking = engine
        .create_booking(SHOP_A, request(&["cut"], None, "10:00"))
        .unwrap();
    assert_eq!(booking.staff_id, "ben");

    // Both Ana and Ben are now taken at 10:00
    let err = engine
        .create_booking(SHOP_A, request(&["cut"], None, "10:00"))
        .unwrap_err();
    assert!(matches!(err, SchedulingError::StaffUnavailable(_)));
}

#[test]
fn test_concurrent_creations_yield_one_booking() {
    let engine = Arc::new(engine());
    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                scope.spawn(move || {
                    engine.create_booking(SHOP_A, request(&["color"], Some("ana"), "14:00"))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let succeeded = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(outcomes
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, SchedulingError::StaffUnavailable(_))));

    let stored = engine
        .store()
        .find_bookings_for_staff_on_date(SHOP_A, "ana", date(MONDAY))
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[test]
fn test_concurrent_overlapping_intervals() {
    let engine = Arc::new(engine());
    let starts = ["13:00", "13:15", "13:30", "13:45", "14:00", "14:15"];
    std::thread::scope(|scope| {
        for start in starts {
            let engine = Arc::clone(&engine);
            scope.spawn(move || {
                let _ = engine.create_booking(SHOP_A, request(&["color"], Some("ana"), start));
            });
        }
    });

    let stored = engine
        .store()
        .find_bookings_for_staff_on_date(SHOP_A, "ana", date(MONDAY))
        .unwrap();
    assert!(!stored.is_empty());
    for (i, a) in stored.iter().enumerate() {
        for b in stored.iter().skip(i + 1) {
            assert!(!a.interval().overlaps(&b.interval()), "{} vs {}", a.id, b.id);
        }
    }
}

// ==================== Updates ====================

#[test]
fn test_update_revalidates_longer_services() {
    let engine = engine();
    let first = book(&engine, &["cut"], "ana", "09:00");
    book(&engine, &["cut"], "ana", "09:30");

    let changes = BookingChanges {
        service_ids: Some(ids(&["color"])),
        ..BookingChanges::default()
    };
    let err = engine
        .update_booking(SHOP_A, &first.id, changes)
        .unwrap_err();
    assert!(matches!(err, SchedulingError::StaffUnavailable(_)));

    let stored = engine.get_booking(SHOP_A, &first.id).unwrap();
    assert_eq!(stored.total_duration_minutes, 30);
    assert_eq!(stored.service_ids, vec!["cut"]);
}

#[test]
fn test_update_moves_booking() {
    let engine = engine();
    let booking = book(&engine, &["cut"], "ana", "09:00");

    let changes = BookingChanges {
        service_ids: Some(ids(&["style"])),
        start_time: Some("11:15".parse().unwrap()),
        staff_id: Some("ben".into()),
        ..BookingChanges::default()
    };
    let updated = engine.update_booking(SHOP_A, &booking.id, changes).unwrap();
    assert_eq!(updated.staff_id, "ben");
    assert_eq!(updated.end_time.to_string(), "12:00");
    assert_eq!(updated.total_price, Decimal::new(4000, 2));

    // The old slot is free again
    book(&engine, &["cut"], "ana", "09:00");
}

#[test]
fn test_update_checks_new_staff_shift() {
    let engine = engine();
    let booking = book(&engine, &["cut"], "ana", "15:00");
    let changes = BookingChanges {
        staff_id: Some("ben".into()),
        ..BookingChanges::default()
    };
    let err = engine
        .update_booking(SHOP_A, &booking.id, changes)
        .unwrap_err();
    assert!(matches!(err, SchedulingError::StaffUnavailable(_)));
}

#[test]
fn test_notes_only_edit_skips_guard() {
    let engine = engine();
    let booking = book(&engine, &["cut"], "ana", "09:00");
    engine.cancel(SHOP_A, &booking.id).unwrap();

    let changes = BookingChanges {
        notes: Some("called to apologise".into()),
        ..BookingChanges::default()
    };
    let updated = engine.update_booking(SHOP_A, &booking.id, changes).unwrap();
    assert_eq!(updated.notes.as_deref(), Some("called to apologise"));

    let reschedule = BookingChanges {
        start_time: Some("10:00".parse().unwrap()),
        ..BookingChanges::default()
    };
    let err = engine
        .update_booking(SHOP_A, &booking.id, reschedule)
        .unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::BookingClosed(BookingStatus::Cancelled)
    ));
}

// ==================== Lifecycle ====================

#[test]
fn test_status_flow() {
    let engine = engine();
    let mut req = request(&["cut"], Some("ana"), "09:00");
    req.channel = BookingChannel::Staff;
    let booking = engine.create_booking(SHOP_A, req).unwrap();

    let confirmed = engine
        .transition(SHOP_A, &booking.id, BookingStatus::Confirmed)
        .unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let completed = engine
        .transition(SHOP_A, &booking.id, BookingStatus::Completed)
        .unwrap();
    assert_eq!(completed.status, BookingStatus::Completed);

    let err = engine.cancel(SHOP_A, &booking.id).unwrap_err();
    assert!(matches!(
        err,
        SchedulingError::InvalidTransition {
            from: BookingStatus::Completed,
            to: BookingStatus::Cancelled
        }
    ));
}

#[test]
fn test_cancel_twice_fails() {
    let engine = engine();
    let booking = book(&engine, &["cut"], "ana", "09:00");
    engine.cancel(SHOP_A, &booking.id).unwrap();
    assert!(matches!(
        engine.cancel(SHOP_A, &booking.id).unwrap_err(),
        SchedulingError::InvalidTransition { .. }
    ));
}

#[test]
fn test_notifier_receives_events() {
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = engine().with_notifier(notifier.clone());

    let mut req = request(&["cut"], Some("ana"), "09:00");
    req.channel = BookingChannel::Staff;
    let booking = engine.create_booking(SHOP_A, req).unwrap();
    engine
        .transition(SHOP_A, &booking.id, BookingStatus::Confirmed)
        .unwrap();
    engine.cancel(SHOP_A, &booking.id).unwrap();

    // Failed operations emit nothing
    let _ = engine.cancel(SHOP_A, &booking.id);

    assert_eq!(
        notifier.events(),
        vec![
            format!("created {}", booking.id),
            format!("status {} PENDING->CONFIRMED", booking.id),
            format!("cancelled {}", booking.id),
        ]
    );
}

// ==================== Lookup & isolation ====================

#[test]
fn test_lookup_by_code_and_isolation() {
    let engine = engine();
    let booking = book(&engine, &["cut"], "ana", "09:00");

    let found = engine
        .get_booking_by_code(SHOP_A, &booking.booking_code.to_lowercase())
        .unwrap();
    assert_eq!(found.id, booking.id);

    assert!(matches!(
        engine.get_booking(SHOP_B, &booking.id).unwrap_err(),
        SchedulingError::NotFound(_)
    ));
    assert!(matches!(
        engine.cancel(SHOP_B, &booking.id).unwrap_err(),
        SchedulingError::NotFound(_)
    ));
    assert!(engine.list_bookings(SHOP_B, date(MONDAY)).unwrap().is_empty());
    assert_eq!(engine.list_bookings(SHOP_A, date(MONDAY)).unwrap().len(), 1);
}

#[test]
fn test_engine_config_validation() {
    assert!(EngineConfig::default().validate().is_ok());
    let zero = EngineConfig {
        slot_step_minutes: 0,
        ..EngineConfig::default()
    };
    assert!(zero.validate().is_err());
}
