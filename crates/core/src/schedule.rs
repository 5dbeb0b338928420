//! # Schedule Model
//!
//! Working windows and the breaks nested inside them, the read contract the
//! availability engine consumes ([`ScheduleModel`]), and the validation hooks
//! that guard every write ([`validate_window`], [`validate_break`]).
//!
//! [`ScheduleService`] is the management layer on top of a [`ScheduleStore`]:
//! it runs the hooks before anything is persisted.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{ConfigurationConflict, SalonError, SalonResult};
use crate::models::schedule::{
    Break, CreateBreakRequest, CreateWindowRequest, DayOfWeek, UpdateWindowRequest, WorkingWindow,
};

/// Read-only view of employee schedules.
#[async_trait]
pub trait ScheduleModel: Send + Sync {
    /// `None` means the employee does not work that day.
    async fn get_working_window(
        &self,
        employee_id: Uuid,
        day: DayOfWeek,
    ) -> SalonResult<Option<WorkingWindow>>;

    /// Breaks of a window, ordered by start time.
    async fn list_breaks(&self, window_id: Uuid) -> SalonResult<Vec<Break>>;
}

/// Persistence for working windows and breaks.
///
/// Deleting a window removes its breaks; deleting an employee's schedule
/// removes every window and break the employee owns.
#[async_trait]
pub trait ScheduleStore: ScheduleModel {
    async fn get_window(&self, id: Uuid) -> SalonResult<Option<WorkingWindow>>;

    /// All windows of an employee, ordered Monday to Sunday.
    async fn list_windows(&self, employee_id: Uuid) -> SalonResult<Vec<WorkingWindow>>;

    async fn insert_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow>;

    /// Rejects bounds that would leave a stored break outside the window,
    /// checked atomically with the write.
    async fn update_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow>;

    async fn delete_window(&self, id: Uuid) -> SalonResult<()>;

    async fn get_break(&self, id: Uuid) -> SalonResult<Option<Break>>;

    /// Re-runs [`validate_break`] against the stored window and breaks
    /// atomically with the write, so concurrent inserts cannot overlap.
    async fn insert_break(&self, brk: &Break) -> SalonResult<Break>;

    async fn delete_break(&self, id: Uuid) -> SalonResult<()>;

    /// Returns the number of windows removed.
    async fn delete_employee_schedule(&self, employee_id: Uuid) -> SalonResult<u64>;
}

#[async_trait]
impl<T: ScheduleModel + ?Sized> ScheduleModel for Arc<T> {
    async fn get_working_window(
        &self,
        employee_id: Uuid,
        day: DayOfWeek,
    ) -> SalonResult<Option<WorkingWindow>> {
        (**self).get_working_window(employee_id, day).await
    }

    async fn list_breaks(&self, window_id: Uuid) -> SalonResult<Vec<Break>> {
        (**self).list_breaks(window_id).await
    }
}

#[async_trait]
impl<T: ScheduleStore + ?Sized> ScheduleStore for Arc<T> {
    async fn get_window(&self, id: Uuid) -> SalonResult<Option<WorkingWindow>> {
        (**self).get_window(id).await
    }

    async fn list_windows(&self, employee_id: Uuid) -> SalonResult<Vec<WorkingWindow>> {
        (**self).list_windows(employee_id).await
    }

    async fn insert_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow> {
        (**self).insert_window(window).await
    }

    async fn update_window(&self, window: &WorkingWindow) -> SalonResult<WorkingWindow> {
        (**self).update_window(window).await
    }

    async fn delete_window(&self, id: Uuid) -> SalonResult<()> {
        (**self).delete_window(id).await
    }

    async fn get_break(&self, id: Uuid) -> SalonResult<Option<Break>> {
        (**self).get_break(id).await
    }

    async fn insert_break(&self, brk: &Break) -> SalonResult<Break> {
        (**self).insert_break(brk).await
    }

    async fn delete_break(&self, id: Uuid) -> SalonResult<()> {
        (**self).delete_break(id).await
    }

    async fn delete_employee_schedule(&self, employee_id: Uuid) -> SalonResult<u64> {
        (**self).delete_employee_schedule(employee_id).await
    }
}

/// Checks a new or edited window against the windows that already exist.
///
/// `existing` may contain windows of other employees or days; only a window
/// with a different id for the same (employee, day) is a conflict.
pub fn validate_window(
    candidate: &WorkingWindow,
    existing: &[WorkingWindow],
) -> Result<(), ConfigurationConflict> {
    if !candidate.hours().is_valid() {
        return Err(ConfigurationConflict::InvalidRange);
    }

    let duplicate = existing.iter().any(|w| {
        w.id != candidate.id
            && w.employee_id == candidate.employee_id
            && w.day_of_week == candidate.day_of_week
    });
    if duplicate {
        return Err(ConfigurationConflict::DuplicateDay);
    }

    Ok(())
}

/// Checks that a break fits inside its window and does not overlap the
/// window's other breaks.
pub fn validate_break(
    window: &WorkingWindow,
    candidate: &Break,
    existing: &[Break],
) -> Result<(), ConfigurationConflict> {
    let hours = candidate.hours();
    if !hours.is_valid() {
        return Err(ConfigurationConflict::InvalidRange);
    }
    if !window.hours().contains(&hours) {
        return Err(ConfigurationConflict::OutsideWindow);
    }

    let overlapping = existing
        .iter()
        .filter(|b| b.id != candidate.id)
        .any(|b| b.hours().overlaps(&hours));
    if overlapping {
        return Err(ConfigurationConflict::OverlapsExistingBreak);
    }

    Ok(())
}

/// Checks that resized window bounds still hold every existing break.
pub fn validate_window_resize(
    resized: &WorkingWindow,
    breaks: &[Break],
) -> Result<(), ConfigurationConflict> {
    let hours = resized.hours();
    if !hours.is_valid() {
        return Err(ConfigurationConflict::InvalidRange);
    }
    if breaks.iter().any(|b| !hours.contains(&b.hours())) {
        return Err(ConfigurationConflict::OutsideWindow);
    }
    Ok(())
}

pub struct ScheduleService<S> {
    store: S,
}

impl<S: ScheduleStore> ScheduleService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn create_window(
        &self,
        employee_id: Uuid,
        request: CreateWindowRequest,
    ) -> SalonResult<WorkingWindow> {
        let window = WorkingWindow {
            id: Uuid::new_v4(),
            employee_id,
            day_of_week: request.day_of_week,
            start_time: request.start_time,
            end_time: request.end_time,
        };

        let existing = self.store.list_windows(employee_id).await?;
        validate_window(&window, &existing)?;

        let created = self.store.insert_window(&window).await?;
        info!(
            "Working window created: id={}, employee={}, day={}, {}-{}",
            created.id, employee_id, created.day_of_week, created.start_time, created.end_time
        );
        Ok(created)
    }

    pub async fn get_window(&self, id: Uuid) -> SalonResult<WorkingWindow> {
        self.store
            .get_window(id)
            .await?
            .ok_or_else(|| SalonError::NotFound(format!("Working window with ID {} not found", id)))
    }

    pub async fn list_windows(&self, employee_id: Uuid) -> SalonResult<Vec<WorkingWindow>> {
        self.store.list_windows(employee_id).await
    }

    pub async fn update_window(
        &self,
        id: Uuid,
        request: UpdateWindowRequest,
    ) -> SalonResult<WorkingWindow> {
        let current = self.get_window(id).await?;
        let resized = WorkingWindow {
            start_time: request.start_time.unwrap_or(current.start_time),
            end_time: request.end_time.unwrap_or(current.end_time),
            ..current
        };

        let breaks = self.store.list_breaks(id).await?;
        validate_window_resize(&resized, &breaks)?;

        let updated = self.store.update_window(&resized).await?;
        info!(
            "Working window updated: id={}, {}-{}",
            updated.id, updated.start_time, updated.end_time
        );
        Ok(updated)
    }

    pub async fn delete_window(&self, id: Uuid) -> SalonResult<()> {
        self.get_window(id).await?;
        self.store.delete_window(id).await?;
        info!("Working window deleted with its breaks: id={}", id);
        Ok(())
    }

    pub async fn list_breaks(&self, window_id: Uuid) -> SalonResult<Vec<Break>> {
        self.get_window(window_id).await?;
        self.store.list_breaks(window_id).await
    }

    pub async fn add_break(&self, window_id: Uuid, request: CreateBreakRequest) -> SalonResult<Break> {
        let window = self.get_window(window_id).await?;
        let candidate = Break {
            id: Uuid::new_v4(),
            window_id,
            start_time: request.start_time,
            end_time: request.end_time,
        };

        let existing = self.store.list_breaks(window_id).await?;
        debug!(
            "Validating break {}-{} against {} existing breaks",
            candidate.start_time,
            candidate.end_time,
            existing.len()
        );
        validate_break(&window, &candidate, &existing)?;

        let created = self.store.insert_break(&candidate).await?;
        info!(
            "Break created: id={}, window={}, {}-{}",
            created.id, window_id, created.start_time, created.end_time
        );
        Ok(created)
    }

    pub async fn delete_break(&self, id: Uuid) -> SalonResult<()> {
        self.store
            .get_break(id)
            .await?
            .ok_or_else(|| SalonError::NotFound(format!("Break with ID {} not found", id)))?;
        self.store.delete_break(id).await?;
        info!("Break deleted: id={}", id);
        Ok(())
    }

    /// Explicit cascade used when an employee is removed.
    pub async fn remove_employee_schedule(&self, employee_id: Uuid) -> SalonResult<u64> {
        let removed = self.store.delete_employee_schedule(employee_id).await?;
        info!(
            "Removed {} working windows for employee {}",
            removed, employee_id
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use pretty_assertions::assert_eq;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn monday(employee_id: Uuid, start: NaiveTime, end: NaiveTime) -> WorkingWindow {
        WorkingWindow {
            id: Uuid::new_v4(),
            employee_id,
            day_of_week: DayOfWeek::Monday,
            start_time: start,
            end_time: end,
        }
    }

    fn brk(window: &WorkingWindow, start: NaiveTime, end: NaiveTime) -> Break {
        Break {
            id: Uuid::new_v4(),
            window_id: window.id,
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn window_with_inverted_range_is_rejected() {
        let window = monday(Uuid::new_v4(), t(17, 0), t(9, 0));
        assert_eq!(
            validate_window(&window, &[]),
            Err(ConfigurationConflict::InvalidRange)
        );
    }

    #[test]
    fn window_with_empty_range_is_rejected() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(9, 0));
        assert_eq!(
            validate_window(&window, &[]),
            Err(ConfigurationConflict::InvalidRange)
        );
    }

    #[test]
    fn second_window_for_same_day_is_a_duplicate() {
        let employee = Uuid::new_v4();
        let existing = monday(employee, t(9, 0), t(12, 0));
        let candidate = monday(employee, t(13, 0), t(17, 0));
        assert_eq!(
            validate_window(&candidate, &[existing]),
            Err(ConfigurationConflict::DuplicateDay)
        );
    }

    #[test]
    fn windows_of_other_days_and_employees_do_not_conflict() {
        let employee = Uuid::new_v4();
        let mut tuesday = monday(employee, t(9, 0), t(17, 0));
        tuesday.day_of_week = DayOfWeek::Tuesday;
        let colleague = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        let candidate = monday(employee, t(9, 0), t(17, 0));

        assert_eq!(validate_window(&candidate, &[tuesday, colleague]), Ok(()));
    }

    #[test]
    fn window_does_not_conflict_with_itself() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        assert_eq!(validate_window(&window, &[window.clone()]), Ok(()));
    }

    #[test]
    fn break_must_fit_inside_window() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        let early = brk(&window, t(8, 30), t(9, 30));
        let late = brk(&window, t(16, 30), t(17, 30));
        assert_eq!(
            validate_break(&window, &early, &[]),
            Err(ConfigurationConflict::OutsideWindow)
        );
        assert_eq!(
            validate_break(&window, &late, &[]),
            Err(ConfigurationConflict::OutsideWindow)
        );
    }

    #[test]
    fn break_touching_window_edges_is_accepted() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        let first = brk(&window, t(9, 0), t(9, 15));
        let last = brk(&window, t(16, 45), t(17, 0));
        assert_eq!(validate_break(&window, &first, &[]), Ok(()));
        assert_eq!(validate_break(&window, &last, &[first]), Ok(()));
    }

    #[test]
    fn overlapping_breaks_are_rejected_but_adjacent_ones_are_not() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        let lunch = brk(&window, t(12, 0), t(13, 0));

        let overlapping = brk(&window, t(12, 30), t(13, 30));
        assert_eq!(
            validate_break(&window, &overlapping, &[lunch.clone()]),
            Err(ConfigurationConflict::OverlapsExistingBreak)
        );

        let adjacent = brk(&window, t(13, 0), t(13, 15));
        assert_eq!(validate_break(&window, &adjacent, &[lunch]), Ok(()));
    }

    #[test]
    fn inverted_break_is_an_invalid_range() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        let inverted = brk(&window, t(13, 0), t(12, 0));
        assert_eq!(
            validate_break(&window, &inverted, &[]),
            Err(ConfigurationConflict::InvalidRange)
        );
    }

    #[test]
    fn shrinking_window_past_a_break_is_rejected() {
        let window = monday(Uuid::new_v4(), t(9, 0), t(17, 0));
        let lunch = brk(&window, t(12, 0), t(13, 0));

        let shrunk = WorkingWindow {
            end_time: t(12, 30),
            ..window.clone()
        };
        assert_eq!(
            validate_window_resize(&shrunk, &[lunch.clone()]),
            Err(ConfigurationConflict::OutsideWindow)
        );

        let still_fits = WorkingWindow {
            end_time: t(13, 0),
            ..window
        };
        assert_eq!(validate_window_resize(&still_fits, &[lunch]), Ok(()));
    }
}
