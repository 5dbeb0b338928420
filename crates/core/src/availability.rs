//! # Availability Engine
//!
//! Decides whether an employee can be booked for `duration_minutes` starting
//! at a given instant. The decision is a pure function of the data the
//! collaborators return: the engine never writes and never caches.
//!
//! ## Algorithm
//!
//! Request shape is checked before any lookup:
//!
//! 1. duration must be positive, start and end must share a calendar date
//!    (in the offset the start was given in)
//!
//! Then, in order, the first failing check decides the outcome:
//!
//! 1. the employee has a working window that day, and the slot lies inside it
//! 2. the slot overlaps none of the window's breaks
//! 3. the slot overlaps none of the employee's scheduled visits that day
//!
//! All overlap tests are half-open, so back-to-back slots never conflict.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{InvalidRequest, SalonError, SalonResult};
use crate::interval::Interval;
use crate::models::schedule::DayOfWeek;
use crate::models::visit::{Visit, VisitStatus};
use crate::schedule::ScheduleModel;

/// Source of already-booked visits, backed by persistent storage.
#[async_trait]
pub trait VisitLookup: Send + Sync {
    /// Visits of `employee_id` with status `scheduled` that overlap `range`.
    async fn find_scheduled_visits(
        &self,
        employee_id: Uuid,
        range: Interval<DateTime<Utc>>,
    ) -> SalonResult<Vec<Visit>>;
}

#[async_trait]
impl<T: VisitLookup + ?Sized> VisitLookup for Arc<T> {
    async fn find_scheduled_visits(
        &self,
        employee_id: Uuid,
        range: Interval<DateTime<Utc>>,
    ) -> SalonResult<Vec<Visit>> {
        (**self).find_scheduled_visits(employee_id, range).await
    }
}

/// Why a well-formed slot cannot be booked.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    #[error("Employee does not work on that day")]
    DayOff,

    #[error("Slot is outside working hours")]
    OutsideWorkingHours,

    #[error("Slot overlaps a break")]
    OverlapsBreak,

    #[error("Slot overlaps an existing visit")]
    OverlapsVisit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum AvailabilityResult {
    Available,
    Invalid(InvalidRequest),
    Unavailable(UnavailableReason),
}

impl AvailabilityResult {
    pub fn is_available(&self) -> bool {
        matches!(self, AvailabilityResult::Available)
    }

    /// Turns a rejection into the matching [`SalonError`].
    pub fn into_result(self) -> SalonResult<()> {
        match self {
            AvailabilityResult::Available => Ok(()),
            AvailabilityResult::Invalid(reason) => Err(SalonError::InvalidRequest(reason)),
            AvailabilityResult::Unavailable(reason) => Err(SalonError::Unavailable(reason)),
        }
    }
}

/// A candidate slot in the offset the caller resolved it to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestedSlot {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl RequestedSlot {
    pub fn new(start: DateTime<FixedOffset>, duration_minutes: i32) -> Result<Self, InvalidRequest> {
        if duration_minutes <= 0 {
            return Err(InvalidRequest::NonPositiveDuration);
        }

        let end = start
            .checked_add_signed(Duration::minutes(i64::from(duration_minutes)))
            .ok_or(InvalidRequest::SpansMidnight)?;
        if start.date_naive() != end.date_naive() {
            return Err(InvalidRequest::SpansMidnight);
        }

        let slot = Self { start, end };
        slot.calendar_day()?;
        Ok(slot)
    }

    pub fn day_of_week(&self) -> DayOfWeek {
        self.start.weekday().into()
    }

    /// Wall-clock times within the day, comparable with windows and breaks.
    pub fn time_of_day(&self) -> Interval<NaiveTime> {
        Interval::new(self.start.time(), self.end.time())
    }

    pub fn instants(&self) -> Interval<DateTime<Utc>> {
        Interval::new(self.start.with_timezone(&Utc), self.end.with_timezone(&Utc))
    }

    /// The slot's whole calendar day, `[00:00, next 00:00)` local.
    ///
    /// Fails only for slots on the first or last day chrono can represent.
    pub fn calendar_day(&self) -> Result<Interval<DateTime<Utc>>, InvalidRequest> {
        let time = self.start.time();
        let since_midnight = Duration::seconds(i64::from(time.num_seconds_from_midnight()))
            + Duration::nanoseconds(i64::from(time.nanosecond()));
        let day_start = self
            .start
            .checked_sub_signed(since_midnight)
            .ok_or(InvalidRequest::OutOfRange)?;
        let day_end = day_start
            .checked_add_signed(Duration::days(1))
            .ok_or(InvalidRequest::OutOfRange)?;
        Ok(Interval::new(
            day_start.with_timezone(&Utc),
            day_end.with_timezone(&Utc),
        ))
    }
}

pub struct AvailabilityEngine<S> {
    schedule: S,
}

impl<S: ScheduleModel> AvailabilityEngine<S> {
    pub fn new(schedule: S) -> Self {
        Self { schedule }
    }

    pub async fn check_availability<V: VisitLookup + ?Sized>(
        &self,
        employee_id: Uuid,
        start: DateTime<FixedOffset>,
        duration_minutes: i32,
        visits: &V,
    ) -> SalonResult<AvailabilityResult> {
        self.evaluate(employee_id, start, duration_minutes, None, visits)
            .await
    }

    /// Same as [`check_availability`](Self::check_availability), but the
    /// visit being moved does not conflict with its own current slot.
    pub async fn check_reschedule<V: VisitLookup + ?Sized>(
        &self,
        visit_id: Uuid,
        employee_id: Uuid,
        start: DateTime<FixedOffset>,
        duration_minutes: i32,
        visits: &V,
    ) -> SalonResult<AvailabilityResult> {
        self.evaluate(employee_id, start, duration_minutes, Some(visit_id), visits)
            .await
    }

    async fn evaluate<V: VisitLookup + ?Sized>(
        &self,
        employee_id: Uuid,
        start: DateTime<FixedOffset>,
        duration_minutes: i32,
        exclude_visit: Option<Uuid>,
        visits: &V,
    ) -> SalonResult<AvailabilityResult> {
        let slot = match RequestedSlot::new(start, duration_minutes) {
            Ok(slot) => slot,
            Err(reason) => {
                debug!("Rejected slot request for employee {}: {}", employee_id, reason);
                return Ok(AvailabilityResult::Invalid(reason));
            }
        };

        let day = slot.day_of_week();
        let Some(window) = self.schedule.get_working_window(employee_id, day).await? else {
            debug!("Employee {} has no working window on {}", employee_id, day);
            return Ok(AvailabilityResult::Unavailable(UnavailableReason::DayOff));
        };

        let hours = slot.time_of_day();
        if !window.hours().contains(&hours) {
            return Ok(AvailabilityResult::Unavailable(
                UnavailableReason::OutsideWorkingHours,
            ));
        }

        let breaks = self.schedule.list_breaks(window.id).await?;
        if let Some(brk) = breaks.iter().find(|b| b.hours().overlaps(&hours)) {
            debug!(
                "Slot {}-{} overlaps break {}-{}",
                hours.start, hours.end, brk.start_time, brk.end_time
            );
            return Ok(AvailabilityResult::Unavailable(UnavailableReason::OverlapsBreak));
        }

        let occupied = slot.instants();
        let day_range = match slot.calendar_day() {
            Ok(range) => range,
            Err(reason) => return Ok(AvailabilityResult::Invalid(reason)),
        };
        let booked = visits
            .find_scheduled_visits(employee_id, day_range)
            .await?;
        let conflict = booked
            .iter()
            .filter(|v| v.status == VisitStatus::Scheduled)
            .filter(|v| Some(v.id) != exclude_visit)
            .find(|v| v.occupied().overlaps(&occupied));
        if let Some(visit) = conflict {
            debug!(
                "Slot {}-{} conflicts with visit {} ({}-{})",
                occupied.start, occupied.end, visit.id, visit.start_time, visit.end_time
            );
            return Ok(AvailabilityResult::Unavailable(UnavailableReason::OverlapsVisit));
        }

        Ok(AvailabilityResult::Available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(offset_hours: i32, y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(offset_hours * 3600)
            .unwrap()
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
    }

    #[test]
    fn zero_and_negative_durations_are_invalid() {
        let start = at(0, 2024, 1, 15, 10, 0);
        assert_eq!(
            RequestedSlot::new(start, 0),
            Err(InvalidRequest::NonPositiveDuration)
        );
        assert_eq!(
            RequestedSlot::new(start, -30),
            Err(InvalidRequest::NonPositiveDuration)
        );
    }

    #[test]
    fn slot_ending_at_next_midnight_spans_midnight() {
        let start = at(0, 2024, 1, 15, 23, 30);
        assert_eq!(
            RequestedSlot::new(start, 30),
            Err(InvalidRequest::SpansMidnight)
        );
        assert!(RequestedSlot::new(start, 29).is_ok());
    }

    #[test]
    fn calendar_day_follows_the_given_offset() {
        // 00:30 on the 16th at +02:00 is still the 15th in UTC.
        let slot = RequestedSlot::new(at(2, 2024, 1, 16, 0, 30), 30).unwrap();
        let day = slot.calendar_day().unwrap();
        assert_eq!(day.start, Utc.with_ymd_and_hms(2024, 1, 15, 22, 0, 0).unwrap());
        assert_eq!(day.end, Utc.with_ymd_and_hms(2024, 1, 16, 22, 0, 0).unwrap());
        assert_eq!(slot.day_of_week(), DayOfWeek::Tuesday);
    }

    #[test]
    fn slot_on_the_last_representable_day_is_out_of_range() {
        let start = (DateTime::<Utc>::MAX_UTC - Duration::hours(1)).fixed_offset();
        assert_eq!(
            RequestedSlot::new(start, 30),
            Err(InvalidRequest::OutOfRange)
        );
    }

    #[test]
    fn time_of_day_uses_local_wall_clock() {
        let slot = RequestedSlot::new(at(-5, 2024, 1, 15, 9, 0), 45).unwrap();
        let hours = slot.time_of_day();
        assert_eq!(hours.start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(hours.end, NaiveTime::from_hms_opt(9, 45, 0).unwrap());
    }

    #[test]
    fn rejections_map_to_errors() {
        assert!(AvailabilityResult::Available.into_result().is_ok());
        assert!(matches!(
            AvailabilityResult::Invalid(InvalidRequest::SpansMidnight).into_result(),
            Err(SalonError::InvalidRequest(InvalidRequest::SpansMidnight))
        ));
        assert!(matches!(
            AvailabilityResult::Unavailable(UnavailableReason::DayOff).into_result(),
            Err(SalonError::Unavailable(UnavailableReason::DayOff))
        ));
    }
}
