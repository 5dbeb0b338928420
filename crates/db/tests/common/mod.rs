#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveTime, TimeZone};
use fake::{Fake, Faker};
use salon_core::{
    booking::BookingService,
    models::{
        schedule::{Break, DayOfWeek, WorkingWindow},
        service::Service,
        visit::BookVisitRequest,
    },
    schedule::ScheduleStore,
};
use salon_db::mock::InMemoryStore;
use uuid::Uuid;

pub fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

/// 2024-01-15 is a Monday.
pub fn monday_at(h: u32, m: u32) -> DateTime<FixedOffset> {
    utc().with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
}

pub fn tuesday_at(h: u32, m: u32) -> DateTime<FixedOffset> {
    utc().with_ymd_and_hms(2024, 1, 16, h, m, 0).unwrap()
}

pub fn service(name: &str, duration_minutes: i32, price_cents: i64) -> Service {
    Service {
        id: Faker.fake::<Uuid>(),
        name: name.to_string(),
        duration_minutes,
        price_cents,
        is_active: true,
    }
}

pub fn window(employee_id: Uuid, day: DayOfWeek, start: NaiveTime, end: NaiveTime) -> WorkingWindow {
    WorkingWindow {
        id: Faker.fake::<Uuid>(),
        employee_id,
        day_of_week: day,
        start_time: start,
        end_time: end,
    }
}

pub struct Salon {
    pub store: Arc<InMemoryStore>,
    pub booking: BookingService<InMemoryStore>,
    pub employee: Uuid,
    pub monday: WorkingWindow,
    pub haircut: Service,
    pub colouring: Service,
}

impl Salon {
    pub fn request(&self, service: &Service, start: DateTime<FixedOffset>) -> BookVisitRequest {
        self.request_for(self.employee, service, start)
    }

    pub fn request_for(
        &self,
        employee_id: Uuid,
        service: &Service,
        start: DateTime<FixedOffset>,
    ) -> BookVisitRequest {
        BookVisitRequest {
            customer_id: Faker.fake::<Uuid>(),
            employee_id,
            service_id: service.id,
            start,
            comment: None,
        }
    }
}

/// One employee working Monday 09:00-17:00 with lunch 12:00-13:00, a 30
/// minute haircut and a 90 minute colouring on the menu.
pub async fn salon() -> Salon {
    let store = Arc::new(InMemoryStore::new());
    let employee = Faker.fake::<Uuid>();

    let monday = store
        .insert_window(&window(employee, DayOfWeek::Monday, t(9, 0), t(17, 0)))
        .await
        .unwrap();
    store
        .insert_break(&Break {
            id: Faker.fake::<Uuid>(),
            window_id: monday.id,
            start_time: t(12, 0),
            end_time: t(13, 0),
        })
        .await
        .unwrap();

    let haircut = store.insert_service(service("Haircut", 30, 2500)).await;
    let colouring = store.insert_service(service("Colouring", 90, 8000)).await;

    Salon {
        booking: BookingService::new(Arc::clone(&store), utc()),
        store,
        employee,
        monday,
        haircut,
        colouring,
    }
}
