//! Half-open time ranges.
//!
//! Every overlap and containment comparison in the crate goes through
//! [`Interval`], whether the endpoints are times of day (working windows,
//! breaks) or absolute instants (visits).

use serde::{Deserialize, Serialize};

/// Half-open interval `[start, end)`.
///
/// Two intervals that only touch at an endpoint do not overlap, which is
/// what allows back-to-back visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval<T> {
    pub start: T,
    pub end: T,
}

impl<T: Ord + Copy> Interval<T> {
    pub fn new(start: T, end: T) -> Self {
        Self { start, end }
    }

    /// `start < end`. Empty and inverted ranges are not valid intervals.
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    pub fn overlaps(&self, other: &Interval<T>) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Returns true if `self` fully contains `other`. Shared endpoints count.
    pub fn contains(&self, other: &Interval<T>) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}
