//! # Booking
//!
//! Books, reschedules, and closes visits on top of the [`AvailabilityEngine`].
//!
//! Checking a slot and persisting the visit are one unit of work per
//! employee: [`EmployeeLocks`] serializes them inside the process, and every
//! [`VisitStore`] must re-check overlap when it commits, so a visit
//! committed by another process after the check still gets rejected with
//! [`SalonError::Conflict`].

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::availability::{AvailabilityEngine, AvailabilityResult, RequestedSlot, VisitLookup};
use crate::errors::{InvalidRequest, SalonError, SalonResult};
use crate::models::service::Service;
use crate::models::visit::{BookVisitRequest, RescheduleRequest, Visit, VisitStatus};
use crate::schedule::ScheduleModel;

#[async_trait]
pub trait VisitStore: VisitLookup {
    async fn get_visit(&self, id: Uuid) -> SalonResult<Option<Visit>>;

    /// Fails with [`SalonError::Conflict`] if a scheduled visit of the same
    /// employee overlaps at commit time.
    async fn insert_visit(&self, visit: &Visit) -> SalonResult<Visit>;

    /// Same commit-time overlap rule as [`insert_visit`](Self::insert_visit),
    /// ignoring the visit's own previous slot.
    async fn update_visit(&self, visit: &Visit) -> SalonResult<Visit>;

    async fn delete_visit(&self, id: Uuid) -> SalonResult<()>;
}

#[async_trait]
pub trait ServiceCatalog: Send + Sync {
    async fn get_service(&self, id: Uuid) -> SalonResult<Option<Service>>;
}

/// One async mutex per employee.
///
/// Entries exist only while a guard is held or a caller is waiting, so ids
/// that never become employees do not accumulate.
#[derive(Debug, Default)]
pub struct EmployeeLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

/// Holds one employee's lock; the map entry is dropped with the last user.
#[derive(Debug)]
pub struct EmployeeGuard<'a> {
    locks: &'a DashMap<Uuid, Arc<Mutex<()>>>,
    employee_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for EmployeeGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Cloning happens under the shard lock, so a count of one means no waiters.
        self.locks
            .remove_if(&self.employee_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl EmployeeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, employee_id: Uuid) -> EmployeeGuard<'_> {
        let lock = Arc::clone(self.locks.entry(employee_id).or_default().value());
        EmployeeGuard {
            locks: &self.locks,
            employee_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Locks every listed employee in ascending id order, so two callers
    /// locking the same pair can never deadlock.
    pub async fn acquire_all(&self, employee_ids: &[Uuid]) -> Vec<EmployeeGuard<'_>> {
        let mut ids = employee_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            guards.push(self.acquire(id).await);
        }
        guards
    }

    /// Number of employees currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

pub struct BookingService<S> {
    store: Arc<S>,
    engine: AvailabilityEngine<Arc<S>>,
    locks: EmployeeLocks,
    calendar: FixedOffset,
}

impl<S> BookingService<S>
where
    S: ScheduleModel + VisitStore + ServiceCatalog,
{
    /// `calendar` is the salon's UTC offset. Every start time is converted
    /// to it before weekday and wall-clock time are derived.
    pub fn new(store: Arc<S>, calendar: FixedOffset) -> Self {
        Self {
            engine: AvailabilityEngine::new(Arc::clone(&store)),
            store,
            locks: EmployeeLocks::new(),
            calendar,
        }
    }

    fn localize<Tz: chrono::TimeZone>(&self, instant: &DateTime<Tz>) -> DateTime<FixedOffset> {
        instant.with_timezone(&self.calendar)
    }

    pub async fn check_availability(
        &self,
        employee_id: Uuid,
        start: DateTime<FixedOffset>,
        duration_minutes: i32,
    ) -> SalonResult<AvailabilityResult> {
        self.engine
            .check_availability(
                employee_id,
                self.localize(&start),
                duration_minutes,
                self.store.as_ref(),
            )
            .await
    }

    async fn active_service(&self, service_id: Uuid) -> SalonResult<Service> {
        let service = self
            .store
            .get_service(service_id)
            .await?
            .ok_or_else(|| SalonError::NotFound(format!("Service with ID {} not found", service_id)))?;

        if !service.is_active {
            return Err(SalonError::Validation(format!(
                "Service {} is not active",
                service.name
            )));
        }
        Ok(service)
    }

    pub async fn get_visit(&self, id: Uuid) -> SalonResult<Visit> {
        self.store
            .get_visit(id)
            .await?
            .ok_or_else(|| SalonError::NotFound(format!("Visit with ID {} not found", id)))
    }

    pub async fn book(&self, request: BookVisitRequest) -> SalonResult<Visit> {
        let service = self.active_service(request.service_id).await?;
        let start = self.localize(&request.start);

        let _guard = self.locks.acquire(request.employee_id).await;

        let decision = self
            .engine
            .check_availability(
                request.employee_id,
                start,
                service.duration_minutes,
                self.store.as_ref(),
            )
            .await?;
        if let Err(rejection) = decision.into_result() {
            warn!(
                "Booking rejected for employee {} at {}: {}",
                request.employee_id, start, rejection
            );
            return Err(rejection);
        }

        let slot = RequestedSlot::new(start, service.duration_minutes)?.instants();
        let now = Utc::now();
        let visit = Visit {
            id: Uuid::new_v4(),
            customer_id: request.customer_id,
            employee_id: request.employee_id,
            service_id: service.id,
            start_time: slot.start,
            end_time: slot.end,
            duration_minutes: service.duration_minutes,
            price_cents: service.price_cents,
            comment: request.comment,
            status: VisitStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };

        let created = self.store.insert_visit(&visit).await?;
        info!(
            "Visit booked: id={}, employee={}, {}-{}",
            created.id, created.employee_id, created.start_time, created.end_time
        );
        Ok(created)
    }

    pub async fn reschedule(&self, id: Uuid, request: RescheduleRequest) -> SalonResult<Visit> {
        let current = self.get_visit(id).await?;
        let employee_id = request.employee_id.unwrap_or(current.employee_id);

        let _guards = self
            .locks
            .acquire_all(&[current.employee_id, employee_id])
            .await;

        // Re-read under the lock: status or assignment may have changed meanwhile.
        let visit = self.get_visit(id).await?;
        if visit.employee_id != current.employee_id {
            return Err(SalonError::Conflict(format!(
                "Visit {} was reassigned while being rescheduled",
                id
            )));
        }
        if visit.status != VisitStatus::Scheduled {
            return Err(InvalidRequest::NotScheduled {
                status: visit.status,
            }
            .into());
        }

        let new_service = match request.service_id {
            Some(service_id) if service_id != visit.service_id => {
                Some(self.active_service(service_id).await?)
            }
            _ => None,
        };
        let moves = request.start.is_some()
            || employee_id != visit.employee_id
            || new_service.is_some();

        let mut updated = visit.clone();
        if let Some(comment) = request.comment {
            updated.comment = Some(comment);
        }

        if moves {
            let (service_id, duration_minutes, price_cents) = match &new_service {
                Some(service) => (service.id, service.duration_minutes, service.price_cents),
                None => (visit.service_id, visit.duration_minutes, visit.price_cents),
            };
            let start = match request.start {
                Some(start) => self.localize(&start),
                None => self.localize(&visit.start_time),
            };

            let decision = self
                .engine
                .check_reschedule(
                    visit.id,
                    employee_id,
                    start,
                    duration_minutes,
                    self.store.as_ref(),
                )
                .await?;
            if let Err(rejection) = decision.into_result() {
                warn!("Reschedule of visit {} rejected: {}", visit.id, rejection);
                return Err(rejection);
            }

            let slot = RequestedSlot::new(start, duration_minutes)?.instants();
            updated.employee_id = employee_id;
            updated.service_id = service_id;
            updated.start_time = slot.start;
            updated.end_time = slot.end;
            updated.duration_minutes = duration_minutes;
            updated.price_cents = price_cents;
        }
        updated.updated_at = Utc::now();

        let saved = self.store.update_visit(&updated).await?;
        info!(
            "Visit updated: id={}, employee={}, {}-{}",
            saved.id, saved.employee_id, saved.start_time, saved.end_time
        );
        Ok(saved)
    }

    pub async fn update_status(&self, id: Uuid, status: VisitStatus) -> SalonResult<Visit> {
        let current = self.get_visit(id).await?;
        let _guard = self.locks.acquire(current.employee_id).await;

        let mut visit = self.get_visit(id).await?;
        if !visit.status.can_transition_to(status) {
            return Err(InvalidRequest::InvalidStatusTransition {
                from: visit.status,
                to: status,
            }
            .into());
        }

        visit.status = status;
        visit.updated_at = Utc::now();
        let saved = self.store.update_visit(&visit).await?;
        info!("Visit {} is now {}", saved.id, saved.status);
        Ok(saved)
    }

    /// Hard delete, for administrative clean-up.
    pub async fn remove(&self, id: Uuid) -> SalonResult<()> {
        let visit = self.get_visit(id).await?;
        let _guard = self.locks.acquire(visit.employee_id).await;
        self.store.delete_visit(id).await?;
        info!("Visit removed: id={}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_employee_lock_is_exclusive() {
        let locks = Arc::new(EmployeeLocks::new());
        let employee = Uuid::new_v4();

        let guard = locks.acquire(employee).await;
        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(employee).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_employees_do_not_block_each_other() {
        let locks = EmployeeLocks::new();
        let _first = locks.acquire(Uuid::new_v4()).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(Uuid::new_v4()),
        )
        .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn acquire_all_dedups_repeated_ids() {
        let locks = EmployeeLocks::new();
        let employee = Uuid::new_v4();
        let guards = locks.acquire_all(&[employee, employee]).await;
        assert_eq!(guards.len(), 1);
    }

    #[tokio::test]
    async fn entries_are_dropped_with_the_last_guard() {
        let locks = EmployeeLocks::new();
        for _ in 0..10 {
            let _guard = locks.acquire(Uuid::new_v4()).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_survives_while_someone_waits() {
        let locks = Arc::new(EmployeeLocks::new());
        let employee = Uuid::new_v4();

        let guard = locks.acquire(employee).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(employee).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
