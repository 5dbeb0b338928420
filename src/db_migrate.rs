use color_eyre::eyre::Result;
use dotenv::dotenv;
use salon::{config::SalonConfig, init_tracing};
use salon_db::{create_pool, schema::initialize_database};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let config = SalonConfig::from_env()?;
    init_tracing(config.log_level)?;

    info!("Connecting to database...");
    let db_pool = create_pool(&config.database_url, config.max_connections).await?;

    initialize_database(&db_pool).await?;

    Ok(())
}
