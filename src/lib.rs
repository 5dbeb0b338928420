//! Shared pieces of the `salon` and `db-migrate` binaries.

pub mod config;
pub mod input;

use eyre::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

pub fn init_tracing(level: Level) -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
