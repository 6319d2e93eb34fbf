//! CLI command implementations
//!
//! Each command module implements one tabula subcommand.

pub mod alter;
pub mod enums;
pub mod inspect;
pub mod tables;

use tabula_migrations::Database;

use crate::config::{Config, DATABASE_URL_ENV};
use crate::error::CliError;

/// Open a session against the configured database.
pub fn connect(config: &Config) -> Result<Database<postgres::Client>, CliError> {
    let url = config.database_url(std::env::var(DATABASE_URL_ENV).ok())?;
    let client = postgres::Client::connect(&url, postgres::NoTls).map_err(|e| {
        CliError::ConnectionError(format!("Failed to connect to PostgreSQL: {}", e))
    })?;
    Ok(Database::with_options(client, config.migration_options()))
}
