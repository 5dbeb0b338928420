mod common;

use std::sync::Arc;

use common::{monday_at, service, t, utc, window};
use fake::{Fake, Faker};
use salon_core::{
    booking::BookingService,
    errors::{ConfigurationConflict, SalonError},
    models::{
        schedule::{CreateWindowRequest, DayOfWeek},
        visit::BookVisitRequest,
    },
    schedule::ScheduleService,
};
use salon_db::mock::MockSalonStore;
use uuid::Uuid;

fn request(employee_id: Uuid, service_id: Uuid) -> BookVisitRequest {
    BookVisitRequest {
        customer_id: Faker.fake::<Uuid>(),
        employee_id,
        service_id,
        start: monday_at(10, 0),
        comment: None,
    }
}

/// A store whose reads describe an open Monday with nothing booked.
fn open_monday(employee_id: Uuid) -> (MockSalonStore, Uuid) {
    let haircut = service("Haircut", 30, 2500);
    let haircut_id = haircut.id;
    let monday = window(employee_id, DayOfWeek::Monday, t(9, 0), t(17, 0));

    let mut store = MockSalonStore::new();
    store
        .expect_get_service()
        .returning(move |_| Ok(Some(haircut.clone())));
    store
        .expect_get_working_window()
        .returning(move |_, _| Ok(Some(monday.clone())));
    store.expect_list_breaks().returning(|_| Ok(vec![]));
    store
        .expect_find_scheduled_visits()
        .returning(|_, _| Ok(vec![]));
    (store, haircut_id)
}

#[tokio::test]
async fn test_commit_conflict_from_storage_surfaces_as_conflict() {
    let employee = Faker.fake::<Uuid>();
    let (mut store, haircut_id) = open_monday(employee);
    store
        .expect_insert_visit()
        .times(1)
        .returning(|_| Err(SalonError::Conflict("no_overlapping_visits".to_string())));

    let booking = BookingService::new(Arc::new(store), utc());
    let result = booking.book(request(employee, haircut_id)).await;

    assert!(matches!(result, Err(SalonError::Conflict(_))));
}

#[tokio::test]
async fn test_storage_failure_during_check_aborts_booking() {
    let employee = Faker.fake::<Uuid>();
    let haircut = service("Haircut", 30, 2500);
    let haircut_id = haircut.id;

    let mut store = MockSalonStore::new();
    store
        .expect_get_service()
        .returning(move |_| Ok(Some(haircut.clone())));
    store
        .expect_get_working_window()
        .returning(|_, _| Err(SalonError::Database(eyre::eyre!("connection refused"))));
    store.expect_insert_visit().never();

    let booking = BookingService::new(Arc::new(store), utc());
    let result = booking.book(request(employee, haircut_id)).await;

    match result {
        Err(SalonError::Database(report)) => {
            assert!(report.to_string().contains("connection refused"))
        }
        other => panic!("Expected Database error, got: {:?}", other),
    }
}

#[tokio::test]
async fn test_service_lookup_happens_before_any_schedule_read() {
    let mut store = MockSalonStore::new();
    store.expect_get_service().times(1).returning(|_| Ok(None));
    store.expect_get_working_window().never();
    store.expect_find_scheduled_visits().never();
    store.expect_insert_visit().never();

    let booking = BookingService::new(Arc::new(store), utc());
    let result = booking
        .book(request(Faker.fake::<Uuid>(), Faker.fake::<Uuid>()))
        .await;

    assert!(matches!(result, Err(SalonError::NotFound(_))));
}

#[tokio::test]
async fn test_available_slot_is_persisted_with_snapshot() {
    let employee = Faker.fake::<Uuid>();
    let (mut store, haircut_id) = open_monday(employee);
    store
        .expect_insert_visit()
        .withf(move |visit| {
            visit.employee_id == employee
                && visit.service_id == haircut_id
                && visit.duration_minutes == 30
                && visit.price_cents == 2500
        })
        .times(1)
        .returning(|visit| Ok(visit.clone()));

    let booking = BookingService::new(Arc::new(store), utc());
    let visit = booking.book(request(employee, haircut_id)).await.unwrap();

    assert_eq!(visit.end_time - visit.start_time, chrono::Duration::minutes(30));
}

#[tokio::test]
async fn test_duplicate_day_raced_in_storage_is_reported() {
    let employee = Faker.fake::<Uuid>();
    let mut store = MockSalonStore::new();
    // Nothing visible at validation time; the unique constraint fires on insert.
    store.expect_list_windows().returning(|_| Ok(vec![]));
    store
        .expect_insert_window()
        .times(1)
        .returning(|_| Err(ConfigurationConflict::DuplicateDay.into()));

    let schedule = ScheduleService::new(store);
    let result = schedule
        .create_window(
            employee,
            CreateWindowRequest {
                day_of_week: DayOfWeek::Monday,
                start_time: t(9, 0),
                end_time: t(17, 0),
            },
        )
        .await;

    assert!(matches!(
        result,
        Err(SalonError::Configuration(ConfigurationConflict::DuplicateDay))
    ));
}
