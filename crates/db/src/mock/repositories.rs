use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::mock;
use salon_core::{
    availability::VisitLookup,
    booking::{ServiceCatalog, VisitStore},
    errors::SalonResult,
    interval::Interval,
    models::{
        schedule::{Break, DayOfWeek, WorkingWindow},
        service::Service,
        visit::Visit,
    },
    schedule::{ScheduleModel, ScheduleStore},
};
use uuid::Uuid;

// Mock store covering every collaborator trait, for failure injection
mock! {
    pub SalonStore {}

    #[async_trait]
    impl ScheduleModel for SalonStore {
        async fn get_working_window(
            &self,
            employee_id: Uuid,
            day: DayOfWeek,
        ) -> SalonResult<Option<WorkingWindow>>;

        async fn list_breaks(&self, window_id: Uuid) -> SalonResult<Vec<Break>>;
    }

    #[async_trait]
    impl ScheduleStore for SalonStore {
        async fn get_window(&self, id: Uuid) -> SalonResult<Option<WorkingWindow>>;

        async fn list_windows(&self, employee_id: Uuid) -> SalonResult<Vec<WorkingWindow>>;

        async fn insert_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow>;

        async fn update_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow>;

        async fn delete_window(&self, id: Uuid) -> SalonResult<()>;

        async fn get_break(&self, id: Uuid) -> SalonResult<Option<Break>>;

        async fn insert_break(&self, brk: &Break) -> SalonResult<Break>;

        async fn delete_break(&self, id: Uuid) -> SalonResult<()>;

        async fn delete_employee_schedule(&self, employee_id: Uuid) -> SalonResult<u64>;
    }

    #[async_trait]
    impl VisitLookup for SalonStore {
        async fn find_scheduled_visits(
            &self,
            employee_id: Uuid,
            range: Interval<DateTime<Utc>>,
        ) -> SalonResult<Vec<Visit>>;
    }

    #[async_trait]
    impl VisitStore for SalonStore {
        async fn get_visit(&self, id: Uuid) -> SalonResult<Option<Visit>>;

        async fn insert_visit(&self, visit: &Visit) -> SalonResult<Visit>;

        async fn update_visit(&self, visit: &Visit) -> SalonResult<Visit>;

        async fn delete_visit(&self, id: Uuid) -> SalonResult<()>;
    }

    #[async_trait]
    impl ServiceCatalog for SalonStore {
        async fn get_service(&self, id: Uuid) -> SalonResult<Option<Service>>;
    }
}
