use crate::models::DbService;
use eyre::Result;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

pub async fn create_service(pool: &Pool<Postgres>, service: &DbService) -> Result<DbService> {
    tracing::debug!("Creating service: id={}, name={}", service.id, service.name);

    let service = sqlx::query_as::<_, DbService>(
        r#"
        INSERT INTO services (id, name, duration_minutes, price_cents, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, name, duration_minutes, price_cents, is_active
        "#,
    )
    .bind(service.id)
    .bind(&service.name)
    .bind(service.duration_minutes)
    .bind(service.price_cents)
    .bind(service.is_active)
    .fetch_one(pool)
    .await?;

    Ok(service)
}

pub async fn get_service_by_id(pool: &Pool<Postgres>, id: Uuid) -> Result<Option<DbService>> {
    let service = sqlx::query_as::<_, DbService>(
        r#"
        SELECT id, name, duration_minutes, price_cents, is_active
        FROM services
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(service)
}

pub async fn set_service_active(pool: &Pool<Postgres>, id: Uuid, is_active: bool) -> Result<Option<DbService>> {
    let service = sqlx::query_as::<_, DbService>(
        r#"
        UPDATE services
        SET is_active = $2
        WHERE id = $1
        RETURNING id, name, duration_minutes, price_cents, is_active
        "#,
    )
    .bind(id)
    .bind(is_active)
    .fetch_optional(pool)
    .await?;

    Ok(service)
}
