use chrono::{DateTime, NaiveTime, Utc};
use eyre::{eyre, Report};
use salon_core::models::{
    schedule::{Break, WorkingWindow},
    service::Service,
    visit::Visit,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Enum columns are stored as TEXT and parsed on the way out.

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbWorkingWindow {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub day_of_week: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbBreak {
    pub id: Uuid,
    pub window_id: Uuid,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbService {
    pub id: Uuid,
    pub name: String,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DbVisit {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub employee_id: Uuid,
    pub service_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub price_cents: i64,
    pub comment: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbWorkingWindow> for WorkingWindow {
    type Error = Report;

    fn try_from(row: DbWorkingWindow) -> Result<Self, Self::Error> {
        Ok(WorkingWindow {
            id: row.id,
            employee_id: row.employee_id,
            day_of_week: row.day_of_week.parse().map_err(|e: String| eyre!(e))?,
            start_time: row.start_time,
            end_time: row.end_time,
        })
    }
}

impl From<&WorkingWindow> for DbWorkingWindow {
    fn from(window: &WorkingWindow) -> Self {
        DbWorkingWindow {
            id: window.id,
            employee_id: window.employee_id,
            day_of_week: window.day_of_week.as_str().to_string(),
            start_time: window.start_time,
            end_time: window.end_time,
        }
    }
}

impl From<DbBreak> for Break {
    fn from(row: DbBreak) -> Self {
        Break {
            id: row.id,
            window_id: row.window_id,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

impl From<DbService> for Service {
    fn from(row: DbService) -> Self {
        Service {
            id: row.id,
            name: row.name,
            duration_minutes: row.duration_minutes,
            price_cents: row.price_cents,
            is_active: row.is_active,
        }
    }
}

impl TryFrom<DbVisit> for Visit {
    type Error = Report;

    fn try_from(row: DbVisit) -> Result<Self, Self::Error> {
        Ok(Visit {
            id: row.id,
            customer_id: row.customer_id,
            employee_id: row.employee_id,
            service_id: row.service_id,
            start_time: row.start_time,
            end_time: row.end_time,
            duration_minutes: row.duration_minutes,
            price_cents: row.price_cents,
            comment: row.comment,
            status: row.status.parse().map_err(|e: String| eyre!(e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Visit> for DbVisit {
    fn from(visit: &Visit) -> Self {
        DbVisit {
            id: visit.id,
            customer_id: visit.customer_id,
            employee_id: visit.employee_id,
            service_id: visit.service_id,
            start_time: visit.start_time,
            end_time: visit.end_time,
            duration_minutes: visit.duration_minutes,
            price_cents: visit.price_cents,
            comment: visit.comment.clone(),
            status: visit.status.as_str().to_string(),
            created_at: visit.created_at,
            updated_at: visit.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use salon_core::models::{schedule::DayOfWeek, visit::VisitStatus};

    #[test]
    fn window_row_round_trip() {
        let window = WorkingWindow {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            day_of_week: DayOfWeek::Saturday,
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        };
        let row = DbWorkingWindow::from(&window);
        assert_eq!(row.day_of_week, "saturday");
        assert_eq!(WorkingWindow::try_from(row).unwrap(), window);
    }

    #[test]
    fn unknown_day_is_rejected() {
        let row = DbWorkingWindow {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            day_of_week: "someday".to_string(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
        };
        assert!(WorkingWindow::try_from(row).is_err());
    }

    #[test]
    fn visit_status_is_stored_as_text() {
        let start = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
        let visit = Visit {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            duration_minutes: 30,
            price_cents: 2500,
            comment: None,
            status: VisitStatus::Cancelled,
            created_at: start,
            updated_at: start,
        };
        let row = DbVisit::from(&visit);
        assert_eq!(row.status, "cancelled");

        let mut broken = row.clone();
        broken.status = "lost".to_string();
        assert!(Visit::try_from(broken).is_err());
        assert_eq!(Visit::try_from(row).unwrap(), visit);
    }
}
