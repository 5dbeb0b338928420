use eyre::Result;
use sqlx::{Pool, Postgres};
use tracing::info;

/// Name of the unique constraint allowing one window per employee and day.
pub const ONE_WINDOW_PER_DAY: &str = "one_window_per_day";

/// Name of the exclusion constraint rejecting overlapping breaks in a window.
pub const NO_OVERLAPPING_BREAKS: &str = "no_overlapping_breaks";

/// Name of the exclusion constraint rejecting overlapping scheduled visits.
pub const NO_OVERLAPPING_VISITS: &str = "no_overlapping_visits";

const STATEMENTS: &[&str] = &[
    // gist indexes over uuid equality need btree_gist
    "CREATE EXTENSION IF NOT EXISTS btree_gist",
    r#"
    CREATE TABLE IF NOT EXISTS services (
        id UUID PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        duration_minutes INTEGER NOT NULL,
        price_cents BIGINT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        CONSTRAINT positive_duration CHECK (duration_minutes > 0),
        CONSTRAINT non_negative_price CHECK (price_cents >= 0)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS working_windows (
        id UUID PRIMARY KEY,
        employee_id UUID NOT NULL,
        day_of_week VARCHAR(16) NOT NULL,
        start_time TIME NOT NULL,
        end_time TIME NOT NULL,
        CONSTRAINT valid_window_range CHECK (end_time > start_time),
        CONSTRAINT valid_day_of_week CHECK (day_of_week IN (
            'monday', 'tuesday', 'wednesday', 'thursday', 'friday', 'saturday', 'sunday'
        )),
        CONSTRAINT one_window_per_day UNIQUE (employee_id, day_of_week)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS work_breaks (
        id UUID PRIMARY KEY,
        window_id UUID NOT NULL REFERENCES working_windows(id),
        start_time TIME NOT NULL,
        end_time TIME NOT NULL,
        CONSTRAINT valid_break_range CHECK (end_time > start_time),
        -- TIME has no range type; anchor both ends on a fixed date
        CONSTRAINT no_overlapping_breaks EXCLUDE USING gist (
            window_id WITH =,
            tsrange('2000-01-01'::date + start_time, '2000-01-01'::date + end_time, '[)') WITH &&
        )
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS visits (
        id UUID PRIMARY KEY,
        customer_id UUID NOT NULL,
        employee_id UUID NOT NULL,
        service_id UUID NOT NULL REFERENCES services(id),
        start_time TIMESTAMP WITH TIME ZONE NOT NULL,
        end_time TIMESTAMP WITH TIME ZONE NOT NULL,
        duration_minutes INTEGER NOT NULL,
        price_cents BIGINT NOT NULL,
        comment TEXT NULL,
        status VARCHAR(16) NOT NULL DEFAULT 'scheduled',
        created_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW(),
        CONSTRAINT valid_visit_range CHECK (end_time > start_time),
        CONSTRAINT valid_visit_status CHECK (status IN ('scheduled', 'completed', 'cancelled')),
        CONSTRAINT no_overlapping_visits EXCLUDE USING gist (
            employee_id WITH =,
            tstzrange(start_time, end_time, '[)') WITH &&
        ) WHERE (status = 'scheduled')
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_working_windows_employee_id ON working_windows(employee_id)",
    "CREATE INDEX IF NOT EXISTS idx_work_breaks_window_id ON work_breaks(window_id)",
    "CREATE INDEX IF NOT EXISTS idx_visits_employee_start ON visits(employee_id, start_time)",
    "CREATE INDEX IF NOT EXISTS idx_visits_customer_id ON visits(customer_id)",
];

/// Creates the tables if they do not exist yet. Not a migration system:
/// existing tables are left untouched.
pub async fn initialize_database(pool: &Pool<Postgres>) -> Result<()> {
    info!("Initializing database schema...");

    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    info!("Database schema initialized successfully.");
    Ok(())
}
