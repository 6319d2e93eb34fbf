//! Tables command implementation
//!
//! Lists the tables visible on the search path.

use crate::config::Config;
use crate::error::CliError;
use crate::output;

/// Run the tables command
pub fn run(config: &Config) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    let tables = db.list_tables()?;

    if tables.is_empty() {
        println!("{}", output::warning("No tables found."));
        return Ok(());
    }

    println!("{}", output::heading(&format!("{} table(s)", tables.len())));
    for table in &tables {
        println!("  {}", table);
    }
    Ok(())
}
