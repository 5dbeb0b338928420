use crate::models::{DbBreak, DbWorkingWindow};
use eyre::Result;
use sqlx::{PgConnection, Pool, Postgres};
use uuid::Uuid;

/// Result of a window or break write checked against the window's breaks.
#[derive(Debug)]
pub enum ScheduleCommit<T> {
    Committed(T),
    /// The window does not exist.
    Missing,
    /// A break would lie outside the window bounds.
    OutsideWindow,
    /// The new break overlaps the break with this id.
    OverlapsBreak(Uuid),
}

/// Row-locks a window so break inserts and resizes of it run one at a time.
async fn lock_window(conn: &mut PgConnection, id: Uuid) -> Result<Option<DbWorkingWindow>> {
    let window = sqlx::query_as::<_, DbWorkingWindow>(
        r#"
        SELECT id, employee_id, day_of_week, start_time, end_time
        FROM working_windows
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(window)
}

pub async fn create_window(pool: &Pool<Postgres>, window: &DbWorkingWindow) -> Result<DbWorkingWindow> {
    tracing::debug!(
        "Creating working window: id={}, employee={}, day={}",
        window.id, window.employee_id, window.day_of_week
    );

    let window = sqlx::query_as::<_, DbWorkingWindow>(
        r#"
        INSERT INTO working_windows (id, employee_id, day_of_week, start_time, end_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, employee_id, day_of_week, start_time, end_time
        "#,
    )
    .bind(window.id)
    .bind(window.employee_id)
    .bind(&window.day_of_week)
    .bind(window.start_time)
    .bind(window.end_time)
    .fetch_one(pool)
    .await?;

    Ok(window)
}

pub async fn get_window_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbWorkingWindow>> {
    tracing::debug!("Getting working window by id: {}", id);

    let window = sqlx::query_as::<_, DbWorkingWindow>(
        r#"
        SELECT id, employee_id, day_of_week, start_time, end_time
        FROM working_windows
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(window)
}

pub async fn get_window_for_day(
    pool: &Pool<Postgres>,
    employee_id: Uuid,
    day_of_week: &str,
) -> Result<Option<DbWorkingWindow>> {
    tracing::debug!(
        "Getting working window: employee={}, day={}",
        employee_id, day_of_week
    );

    let window = sqlx::query_as::<_, DbWorkingWindow>(
        r#"
        SELECT id, employee_id, day_of_week, start_time, end_time
        FROM working_windows
        WHERE employee_id = $1 AND day_of_week = $2
        "#,
    )
    .bind(employee_id)
    .bind(day_of_week)
    .fetch_optional(pool)
    .await?;

    Ok(window)
}

pub async fn get_windows_by_employee_id(
    pool: &Pool<Postgres>,
    employee_id: Uuid,
) -> Result<Vec<DbWorkingWindow>> {
    let windows = sqlx::query_as::<_, DbWorkingWindow>(
        r#"
        SELECT id, employee_id, day_of_week, start_time, end_time
        FROM working_windows
        WHERE employee_id = $1
        ORDER BY array_position(
            ARRAY['monday', 'tuesday', 'wednesday', 'thursday', 'friday', 'saturday', 'sunday']::varchar[],
            day_of_week
        )
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool)
    .await?;

    Ok(windows)
}

/// Resizes a window unless one of its breaks would end up outside it.
pub async fn update_window(
    pool: &Pool<Postgres>,
    window: &DbWorkingWindow,
) -> Result<ScheduleCommit<DbWorkingWindow>> {
    let mut tx = pool.begin().await?;
    if lock_window(&mut tx, window.id).await?.is_none() {
        tx.rollback().await?;
        return Ok(ScheduleCommit::Missing);
    }

    let stray = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM work_breaks
        WHERE window_id = $1
          AND (start_time < $2 OR end_time > $3)
        LIMIT 1
        "#,
    )
    .bind(window.id)
    .bind(window.start_time)
    .bind(window.end_time)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some(stray) = stray {
        tracing::debug!("Resize of window {} would strand break {}", window.id, stray);
        tx.rollback().await?;
        return Ok(ScheduleCommit::OutsideWindow);
    }

    let updated = sqlx::query_as::<_, DbWorkingWindow>(
        r#"
        UPDATE working_windows
        SET start_time = $2, end_time = $3
        WHERE id = $1
        RETURNING id, employee_id, day_of_week, start_time, end_time
        "#,
    )
    .bind(window.id)
    .bind(window.start_time)
    .bind(window.end_time)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(ScheduleCommit::Committed(updated))
}

/// Deletes a window and its breaks in one transaction. Returns whether the
/// window existed.
pub async fn delete_window(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM work_breaks WHERE window_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let deleted = sqlx::query("DELETE FROM working_windows WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    Ok(deleted > 0)
}

/// Deletes every window and break of an employee. Returns the number of
/// windows removed.
pub async fn delete_windows_by_employee_id(pool: &Pool<Postgres>, employee_id: Uuid) -> Result<u64> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        DELETE FROM work_breaks
        WHERE window_id IN (SELECT id FROM working_windows WHERE employee_id = $1)
        "#,
    )
    .bind(employee_id)
    .execute(&mut *tx)
    .await?;
    let deleted = sqlx::query("DELETE FROM working_windows WHERE employee_id = $1")
        .bind(employee_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;
    tracing::debug!("Deleted {} windows of employee {}", deleted, employee_id);
    Ok(deleted)
}

/// Inserts a break after re-checking it against the locked window and the
/// window's other breaks.
pub async fn create_break(pool: &Pool<Postgres>, brk: &DbBreak) -> Result<ScheduleCommit<DbBreak>> {
    let mut tx = pool.begin().await?;
    let Some(window) = lock_window(&mut tx, brk.window_id).await? else {
        tx.rollback().await?;
        return Ok(ScheduleCommit::Missing);
    };

    if brk.start_time < window.start_time || brk.end_time > window.end_time {
        tx.rollback().await?;
        return Ok(ScheduleCommit::OutsideWindow);
    }

    let overlapping = sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT id
        FROM work_breaks
        WHERE window_id = $1
          AND start_time < $3
          AND end_time > $2
          AND id <> $4
        LIMIT 1
        "#,
    )
    .bind(brk.window_id)
    .bind(brk.start_time)
    .bind(brk.end_time)
    .bind(brk.id)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some(existing) = overlapping {
        tx.rollback().await?;
        return Ok(ScheduleCommit::OverlapsBreak(existing));
    }

    let created = sqlx::query_as::<_, DbBreak>(
        r#"
        INSERT INTO work_breaks (id, window_id, start_time, end_time)
        VALUES ($1, $2, $3, $4)
        RETURNING id, window_id, start_time, end_time
        "#,
    )
    .bind(brk.id)
    .bind(brk.window_id)
    .bind(brk.start_time)
    .bind(brk.end_time)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(ScheduleCommit::Committed(created))
}

pub async fn get_break_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbBreak>> {
    let brk = sqlx::query_as::<_, DbBreak>(
        r#"
        SELECT id, window_id, start_time, end_time
        FROM work_breaks
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(brk)
}

pub async fn get_breaks_by_window_id(pool: &Pool<Postgres>, window_id: Uuid) -> Result<Vec<DbBreak>> {
    let breaks = sqlx::query_as::<_, DbBreak>(
        r#"
        SELECT id, window_id, start_time, end_time
        FROM work_breaks
        WHERE window_id = $1
        ORDER BY start_time ASC
        "#,
    )
    .bind(window_id)
    .fetch_all(pool)
    .await?;

    Ok(breaks)
}

pub async fn delete_break(pool: &Pool<Postgres>, id: Uuid) -> Result<bool> {
    let deleted = sqlx::query("DELETE FROM work_breaks WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    Ok(deleted > 0)
}
