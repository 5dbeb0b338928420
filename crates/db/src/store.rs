//! [`PgStore`]: the core collaborator traits backed by PostgreSQL.
//!
//! Repository failures become [`SalonError::Database`], except constraint
//! violations the domain has a name for: the one-window-per-day unique
//! constraint maps to [`ConfigurationConflict::DuplicateDay`], the break
//! exclusion constraint to [`ConfigurationConflict::OverlapsExistingBreak`]
//! and the visit exclusion constraint to [`SalonError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Report;
use salon_core::{
    availability::VisitLookup,
    booking::{ServiceCatalog, VisitStore},
    errors::{ConfigurationConflict, SalonError, SalonResult},
    interval::Interval,
    models::{
        schedule::{Break, DayOfWeek, WorkingWindow},
        service::Service,
        visit::Visit,
    },
    schedule::{ScheduleModel, ScheduleStore},
};
use tracing::warn;
use uuid::Uuid;

use crate::models::{DbBreak, DbService, DbVisit, DbWorkingWindow};
use crate::repositories::{
    schedule, schedule::ScheduleCommit, service, visit, visit::CommitOutcome,
};
use crate::schema::{NO_OVERLAPPING_BREAKS, NO_OVERLAPPING_VISITS, ONE_WINDOW_PER_DAY};
use crate::DbPool;

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Adds a service to the catalog.
    pub async fn insert_service(&self, entry: &Service) -> SalonResult<Service> {
        let row = DbService {
            id: entry.id,
            name: entry.name.clone(),
            duration_minutes: entry.duration_minutes,
            price_cents: entry.price_cents,
            is_active: entry.is_active,
        };
        let created = service::create_service(&self.pool, &row)
            .await
            .map_err(map_db_error)?;
        Ok(created.into())
    }

    pub async fn set_service_active(&self, id: Uuid, is_active: bool) -> SalonResult<Service> {
        service::set_service_active(&self.pool, id, is_active)
            .await
            .map_err(map_db_error)?
            .map(Service::from)
            .ok_or_else(|| SalonError::NotFound(format!("Service with ID {} not found", id)))
    }
}

/// Maps a repository failure to the domain error it stands for.
pub fn map_db_error(err: Report) -> SalonError {
    if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
        match (db_err.code().as_deref(), db_err.constraint()) {
            (Some("23505"), Some(ONE_WINDOW_PER_DAY)) => {
                return ConfigurationConflict::DuplicateDay.into();
            }
            (Some("23P01"), Some(NO_OVERLAPPING_BREAKS)) => {
                return ConfigurationConflict::OverlapsExistingBreak.into();
            }
            (Some("23P01"), Some(NO_OVERLAPPING_VISITS)) | (Some("23P01"), None) => {
                warn!("Storage rejected an overlapping visit: {}", db_err.message());
                return SalonError::Conflict(db_err.message().to_string());
            }
            _ => {}
        }
    }
    SalonError::Database(err)
}

fn commit(outcome: CommitOutcome, visit_id: Uuid) -> SalonResult<Visit> {
    match outcome {
        CommitOutcome::Committed(row) => Ok(Visit::try_from(row)?),
        CommitOutcome::Overlaps(existing) => {
            warn!(
                "Visit {} overlaps scheduled visit {} at commit",
                visit_id, existing
            );
            Err(SalonError::Conflict(format!(
                "Visit {} overlaps scheduled visit {}",
                visit_id, existing
            )))
        }
        CommitOutcome::Missing => Err(SalonError::NotFound(format!(
            "Visit with ID {} not found",
            visit_id
        ))),
    }
}

fn commit_schedule<T>(outcome: ScheduleCommit<T>, window_id: Uuid) -> SalonResult<T> {
    match outcome {
        ScheduleCommit::Committed(row) => Ok(row),
        ScheduleCommit::Missing => Err(SalonError::NotFound(format!(
            "Working window with ID {} not found",
            window_id
        ))),
        ScheduleCommit::OutsideWindow => Err(ConfigurationConflict::OutsideWindow.into()),
        ScheduleCommit::OverlapsBreak(existing) => {
            warn!("Break in window {} overlaps break {} at commit", window_id, existing);
            Err(ConfigurationConflict::OverlapsExistingBreak.into())
        }
    }
}

#[async_trait]
impl ScheduleModel for PgStore {
    async fn get_working_window(
        &self,
        employee_id: Uuid,
        day: DayOfWeek,
    ) -> SalonResult<Option<WorkingWindow>> {
        schedule::get_window_for_day(&self.pool, employee_id, day.as_str())
            .await
            .map_err(map_db_error)?
            .map(WorkingWindow::try_from)
            .transpose()
            .map_err(SalonError::Database)
    }

    async fn list_breaks(&self, window_id: Uuid) -> SalonResult<Vec<Break>> {
        let rows = schedule::get_breaks_by_window_id(&self.pool, window_id)
            .await
            .map_err(map_db_error)?;
        Ok(rows.into_iter().map(Break::from).collect())
    }
}

#[async_trait]
impl ScheduleStore for PgStore {
    async fn get_window(&self, id: Uuid) -> SalonResult<Option<WorkingWindow>> {
        schedule::get_window_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(WorkingWindow::try_from)
            .transpose()
            .map_err(SalonError::Database)
    }

    async fn list_windows(&self, employee_id: Uuid) -> SalonResult<Vec<WorkingWindow>> {
        let rows = schedule::get_windows_by_employee_id(&self.pool, employee_id)
            .await
            .map_err(map_db_error)?;
        rows.into_iter()
            .map(|row| WorkingWindow::try_from(row).map_err(SalonError::Database))
            .collect()
    }

    async fn insert_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow> {
        let row = schedule::create_window(&self.pool, &DbWorkingWindow::from(window))
            .await
            .map_err(map_db_error)?;
        Ok(WorkingWindow::try_from(row)?)
    }

    async fn update_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow> {
        let outcome = schedule::update_window(&self.pool, &DbWorkingWindow::from(window))
            .await
            .map_err(map_db_error)?;
        let row = commit_schedule(outcome, window.id)?;
        Ok(WorkingWindow::try_from(row)?)
    }

    async fn delete_window(&self, id: Uuid) -> SalonResult<()> {
        let existed = schedule::delete_window(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        if !existed {
            return Err(SalonError::NotFound(format!(
                "Working window with ID {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn get_break(&self, id: Uuid) -> SalonResult<Option<Break>> {
        let row = schedule::get_break_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Break::from))
    }

    async fn insert_break(&self, brk: &Break) -> SalonResult<Break> {
        let row = DbBreak {
            id: brk.id,
            window_id: brk.window_id,
            start_time: brk.start_time,
            end_time: brk.end_time,
        };
        let outcome = schedule::create_break(&self.pool, &row)
            .await
            .map_err(map_db_error)?;
        Ok(commit_schedule(outcome, brk.window_id)?.into())
    }

    async fn delete_break(&self, id: Uuid) -> SalonResult<()> {
        let existed = schedule::delete_break(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        if !existed {
            return Err(SalonError::NotFound(format!("Break with ID {} not found", id)));
        }
        Ok(())
    }

    async fn delete_employee_schedule(&self, employee_id: Uuid) -> SalonResult<u64> {
        schedule::delete_windows_by_employee_id(&self.pool, employee_id)
            .await
            .map_err(map_db_error)
    }
}

#[async_trait]
impl VisitLookup for PgStore {
    async fn find_scheduled_visits(
        &self,
        employee_id: Uuid,
        range: Interval<DateTime<Utc>>,
    ) -> SalonResult<Vec<Visit>> {
        let rows = visit::get_scheduled_visits(&self.pool, employee_id, range.start, range.end)
            .await
            .map_err(map_db_error)?;
        rows.into_iter()
            .map(|row| Visit::try_from(row).map_err(SalonError::Database))
            .collect()
    }
}

#[async_trait]
impl VisitStore for PgStore {
    async fn get_visit(&self, id: Uuid) -> SalonResult<Option<Visit>> {
        visit::get_visit_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(Visit::try_from)
            .transpose()
            .map_err(SalonError::Database)
    }

    async fn insert_visit(&self, new_visit: &Visit) -> SalonResult<Visit> {
        let outcome = visit::create_visit(&self.pool, &DbVisit::from(new_visit))
            .await
            .map_err(map_db_error)?;
        commit(outcome, new_visit.id)
    }

    async fn update_visit(&self, changed: &Visit) -> SalonResult<Visit> {
        let outcome = visit::update_visit(&self.pool, &DbVisit::from(changed))
            .await
            .map_err(map_db_error)?;
        commit(outcome, changed.id)
    }

    async fn delete_visit(&self, id: Uuid) -> SalonResult<()> {
        let existed = visit::delete_visit(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        if !existed {
            return Err(SalonError::NotFound(format!("Visit with ID {} not found", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceCatalog for PgStore {
    async fn get_service(&self, id: Uuid) -> SalonResult<Option<Service>> {
        let row = service::get_service_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?;
        Ok(row.map(Service::from))
    }
}
