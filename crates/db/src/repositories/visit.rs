use crate::models::DbVisit;
use chrono::{DateTime, Utc};
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

/// Result of a write that must not overlap another scheduled visit.
#[derive(Debug)]
pub enum CommitOutcome {
    Committed(DbVisit),
    /// Rejected because of the scheduled visit with this id.
    Overlaps(Uuid),
    /// The visit to update does not exist.
    Missing,
}

const VISIT_COLUMNS: &str = "id, customer_id, employee_id, service_id, start_time, end_time, \
     duration_minutes, price_cents, comment, status, created_at, updated_at";

/// Serializes visit writes for one employee until the transaction ends.
async fn lock_employee(conn: &mut PgConnection, employee_id: Uuid) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::uuid::text, 0))")
        .bind(employee_id)
        .execute(conn)
        .await?;
    Ok(())
}

async fn find_overlapping_id(
    conn: &mut PgConnection,
    employee_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Result<Option<Uuid>> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM visits
        WHERE employee_id = $1
          AND status = 'scheduled'
          AND start_time < $3
          AND end_time > $2
          AND ($4::uuid IS NULL OR id <> $4)
        LIMIT 1
        "#,
    )
    .bind(employee_id)
    .bind(start_time)
    .bind(end_time)
    .bind(exclude)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

/// Scheduled visits of an employee overlapping `[start_time, end_time)`.
pub async fn get_scheduled_visits(
    pool: &Pool<Postgres>,
    employee_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<Vec<DbVisit>> {
    tracing::debug!(
        "Getting scheduled visits: employee={}, {}-{}",
        employee_id, start_time, end_time
    );

    let visits = sqlx::query_as::<_, DbVisit>(&format!(
        r#"
        SELECT {VISIT_COLUMNS}
        FROM visits
        WHERE employee_id = $1
          AND status = 'scheduled'
          AND start_time < $3
          AND end_time > $2
        ORDER BY start_time ASC
        "#
    ))
    .bind(employee_id)
    .bind(start_time)
    .bind(end_time)
    .fetch_all(pool)
    .await?;

    Ok(visits)
}

pub async fn get_visit_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbVisit>> {
    let visit = sqlx::query_as::<_, DbVisit>(&format!(
        "SELECT {VISIT_COLUMNS} FROM visits WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(visit)
}

/// Inserts a visit after re-checking overlap under the employee's advisory lock.
pub async fn create_visit(pool: &Pool<Postgres>, visit: &DbVisit) -> Result<CommitOutcome> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, visit.employee_id).await?;

    if visit.status == "scheduled" {
        if let Some(existing) =
            find_overlapping_id(&mut tx, visit.employee_id, visit.start_time, visit.end_time, None)
                .await?
        {
            tx.rollback().await?;
            return Ok(CommitOutcome::Overlaps(existing));
        }
    }

    let created = sqlx::query_as::<_, DbVisit>(&format!(
        r#"
        INSERT INTO visits ({VISIT_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {VISIT_COLUMNS}
        "#
    ))
    .bind(visit.id)
    .bind(visit.customer_id)
    .bind(visit.employee_id)
    .bind(visit.service_id)
    .bind(visit.start_time)
    .bind(visit.end_time)
    .bind(visit.duration_minutes)
    .bind(visit.price_cents)
    .bind(&visit.comment)
    .bind(&visit.status)
    .bind(visit.created_at)
    .bind(visit.updated_at)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::debug!("Visit created successfully: id={}", created.id);
    Ok(CommitOutcome::Committed(created))
}

/// Rewrites a visit, with the same overlap re-check as [`create_visit`]
/// ignoring the visit's own current row.
pub async fn update_visit(pool: &Pool<Postgres>, visit: &DbVisit) -> Result<CommitOutcome> {
    let mut tx = pool.begin().await?;
    lock_employee(&mut tx, visit.employee_id).await?;

    if visit.status == "scheduled" {
        if let Some(existing) = find_overlapping_id(
            &mut tx,
            visit.employee_id,
            visit.start_time,
            visit.end_time,
            Some(visit.id),
        )
        .await?
        {
            tx.rollback().await?;
            return Ok(CommitOutcome::Overlaps(existing));
        }
    }

    let updated = sqlx::query_as::<_, DbVisit>(&format!(
        r#"
        UPDATE visits
        SET employee_id = $2,
            service_id = $3,
            start_time = $4,
            end_time = $5,
            duration_minutes = $6,
            price_cents = $7,
            comment = $8,
            status = $9,
            updated_at = $10
        WHERE id = $1
        RETURNING {VISIT_COLUMNS}
        "#
    ))
    .bind(visit.id)
    .bind(visit.employee_id)
    .bind(visit.service_id)
    .bind(visit.start_time)
    .bind(visit.end_time)
    .bind(visit.duration_minutes)
    .bind(visit.price_cents)
    .bind(&visit.comment)
    .bind(&visit.status)
    .bind(visit.updated_at)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(updated) = updated else {
        tx.rollback().await?;
        return Ok(CommitOutcome::Missing);
    };

    tx.commit().await?;
    Ok(CommitOutcome::Committed(updated))
}

pub async fn delete_visit(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let deleted = sqlx::query("DELETE FROM visits WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}
