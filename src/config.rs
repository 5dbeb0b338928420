//! # Salon Configuration
//!
//! Loaded from environment variables (a `.env` file is honoured by the
//! binaries through `dotenv`):
//!
//! - `DATABASE_URL`: PostgreSQL connection string (required)
//! - `DATABASE_MAX_CONNECTIONS`: pool size (default: 5)
//! - `LOG_LEVEL`: `trace`, `debug`, `info`, `warn` or `error` (default: "info")
//! - `SALON_UTC_OFFSET`: the salon's calendar offset, e.g. `+02:00`
//!   (default: "+00:00")

use chrono::FixedOffset;
use eyre::{eyre, Result, WrapErr};
use std::env;
use tracing::Level;

#[derive(Debug, Clone)]
pub struct SalonConfig {
    pub database_url: String,

    pub max_connections: u32,

    pub log_level: Level,

    /// Offset used to resolve wall-clock input and derive weekdays.
    pub utc_offset: FixedOffset,
}

impl SalonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| eyre!("DATABASE_URL environment variable must be set"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .wrap_err("Invalid DATABASE_MAX_CONNECTIONS value")?;

        let log_level = match lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let utc_offset = parse_offset(&lookup("SALON_UTC_OFFSET").unwrap_or_else(|| "+00:00".to_string()))
            .wrap_err("Invalid SALON_UTC_OFFSET value")?;

        Ok(Self {
            database_url,
            max_connections,
            log_level,
            utc_offset,
        })
    }
}

/// Parses `+HH:MM`, `-HH:MM` or `Z`.
pub fn parse_offset(value: &str) -> Result<FixedOffset> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0).ok_or_else(|| eyre!("offset out of range"));
    }

    value
        .parse::<FixedOffset>()
        .wrap_err_with(|| format!("offset must look like +HH:MM: {}", value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let config =
            SalonConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/salon")]))
                .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/salon");
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.utc_offset, FixedOffset::east_opt(0).unwrap());
    }

    #[test]
    fn database_url_is_required() {
        let err = SalonConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn explicit_values_are_used() {
        let config = SalonConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/salon"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("LOG_LEVEL", "debug"),
            ("SALON_UTC_OFFSET", "+02:00"),
        ]))
        .unwrap();

        assert_eq!(config.max_connections, 12);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.utc_offset, FixedOffset::east_opt(7200).unwrap());
    }

    #[test]
    fn unknown_log_level_falls_back_to_info() {
        let config = SalonConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/salon"),
            ("LOG_LEVEL", "loud"),
        ]))
        .unwrap();
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    fn bad_pool_size_is_an_error() {
        let result = SalonConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/salon"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn offsets_parse() {
        assert_eq!(parse_offset("-05:30").unwrap(), FixedOffset::west_opt(5 * 3600 + 1800).unwrap());
        assert_eq!(parse_offset("Z").unwrap(), FixedOffset::east_opt(0).unwrap());
        assert!(parse_offset("0200").is_err());
        assert!(parse_offset("+02:75").is_err());
        assert!(parse_offset("+25:00").is_err());
    }

    #[test]
    fn doubled_sign_is_rejected() {
        assert!(parse_offset("+-02:00").is_err());
        assert!(parse_offset("-+02:00").is_err());
    }
}
