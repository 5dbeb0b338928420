use thiserror::Error;

use crate::availability::UnavailableReason;
use crate::models::visit::VisitStatus;

/// The request itself is malformed, independent of anyone's schedule.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvalidRequest {
    #[error("Duration must be a positive number of minutes")]
    NonPositiveDuration,

    #[error("Visit cannot span midnight")]
    SpansMidnight,

    #[error("Start time is outside the supported calendar range")]
    OutOfRange,

    #[error("Only scheduled visits can be changed (visit is {status})")]
    NotScheduled { status: VisitStatus },

    #[error("Visit status cannot change from {from} to {to}")]
    InvalidStatusTransition { from: VisitStatus, to: VisitStatus },
}

/// Structural violation while an administrator defines working windows or breaks.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationConflict {
    #[error("Start time must be before end time")]
    InvalidRange,

    #[error("A working window already exists for this employee and day")]
    DuplicateDay,

    #[error("Break must lie within the working window")]
    OutsideWindow,

    #[error("Break overlaps an existing break")]
    OverlapsExistingBreak,
}

#[derive(Error, Debug)]
pub enum SalonError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] InvalidRequest),

    #[error("Slot unavailable: {0}")]
    Unavailable(UnavailableReason),

    #[error("Schedule conflict: {0}")]
    Configuration(#[from] ConfigurationConflict),

    #[error("Booking conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] eyre::Report),
}

pub type SalonResult<T> = Result<T, SalonError>;
