use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use eyre::{eyre, Result};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Resolves a start time typed on the command line into the salon calendar.
///
/// RFC 3339 input keeps its instant and is converted to `calendar`; naive
/// wall-clock input is read as `calendar` local time.
pub fn resolve_start(input: &str, calendar: FixedOffset) -> Result<DateTime<FixedOffset>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&calendar));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .ok_or_else(|| eyre!("Unrecognised start time: {}", input))?;

    calendar
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| eyre!("Start time {} does not exist in offset {}", input, calendar))
}
