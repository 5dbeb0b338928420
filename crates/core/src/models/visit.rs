use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::interval::Interval;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl VisitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VisitStatus::Scheduled => "scheduled",
            VisitStatus::Completed => "completed",
            VisitStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VisitStatus::Scheduled)
    }

    /// `scheduled -> completed | cancelled`; both targets are terminal.
    pub fn can_transition_to(&self, next: VisitStatus) -> bool {
        matches!(
            (self, next),
            (VisitStatus::Scheduled, VisitStatus::Completed)
                | (VisitStatus::Scheduled, VisitStatus::Cancelled)
        )
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VisitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(VisitStatus::Scheduled),
            "completed" => Ok(VisitStatus::Completed),
            "cancelled" => Ok(VisitStatus::Cancelled),
            other => Err(format!("unknown visit status: {other}")),
        }
    }
}

/// A booked appointment.
///
/// Duration and price are copied from the service at booking time; later
/// edits to the service never change an existing visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visit {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub employee_id: Uuid,
    pub service_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub comment: Option<String>,
    pub status: VisitStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Visit {
    pub fn occupied(&self) -> Interval<DateTime<Utc>> {
        Interval::new(self.start_time, self.end_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookVisitRequest {
    pub customer_id: Uuid,
    pub employee_id: Uuid,
    pub service_id: Uuid,
    pub start: DateTime<FixedOffset>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RescheduleRequest {
    pub employee_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub start: Option<DateTime<FixedOffset>>,
    pub comment: Option<String>,
}
