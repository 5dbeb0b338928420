use std::sync::Arc;

use color_eyre::eyre::{eyre, Result, WrapErr};
use dotenv::dotenv;
use salon::{config::SalonConfig, init_tracing, input::resolve_start};
use salon_core::availability::AvailabilityEngine;
use salon_db::{create_pool, PgStore};
use tracing::info;
use uuid::Uuid;

const USAGE: &str = "usage: salon <employee-id> <start> <duration-minutes>";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let config = SalonConfig::from_env()?;
    init_tracing(config.log_level)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [employee, start, duration] = args.as_slice() else {
        return Err(eyre!(USAGE));
    };
    let employee_id: Uuid = employee.parse().wrap_err("Invalid employee id")?;
    let start = resolve_start(start, config.utc_offset)?;
    let duration_minutes: i32 = duration.parse().wrap_err("Invalid duration")?;

    let db_pool = create_pool(&config.database_url, config.max_connections).await?;
    let store = Arc::new(PgStore::new(db_pool));
    let engine = AvailabilityEngine::new(Arc::clone(&store));

    let result = engine
        .check_availability(employee_id, start, duration_minutes, store.as_ref())
        .await?;
    info!(
        "Availability for employee {} at {} ({} min): {:?}",
        employee_id, start, duration_minutes, result
    );

    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}
