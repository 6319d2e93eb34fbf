//! Enum command implementations
//!
//! Creates, drops and lists enum types, and moves text columns onto them.

use colored::Colorize;

use crate::config::Config;
use crate::error::CliError;
use crate::output;

pub fn list(config: &Config) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    let enums = db.list_enums()?;
    if enums.is_empty() {
        println!("{}", output::warning("No enums found."));
        return Ok(());
    }
    for (name, labels) in &enums {
        println!("  {} {}", output::label(name), output::muted(&labels.join(", ")));
    }
    Ok(())
}

pub fn values(config: &Config, name: &str) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    for label in db.enum_values(name)? {
        println!("{label}");
    }
    Ok(())
}

pub fn create(config: &Config, name: &str, labels: &[String]) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    db.create_enum(name, labels)?;
    println!("{}", output::success(&format!("✓ Created enum {name}")));
    Ok(())
}

pub fn drop(config: &Config, name: &str, cascade: bool) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    db.drop_enum(name, cascade)?;
    println!("{}", output::success(&format!("✓ Dropped enum {name}")));
    Ok(())
}

/// Print the values of `table.column` that `enum_name` cannot hold.
pub fn incompatible(
    config: &Config,
    table: &str,
    column: &str,
    enum_name: &str,
) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    let values = db.find_incompatible_values(table, column, enum_name)?;
    if values.is_empty() {
        println!(
            "{}",
            output::success(&format!("All values of {table}.{column} fit {enum_name}"))
        );
        return Ok(());
    }
    println!(
        "{}",
        output::heading(&format!("{} value(s) not in {enum_name}", values.len()))
    );
    for value in &values {
        println!("  {}", value.yellow());
    }
    Ok(())
}

pub fn swap(
    config: &Config,
    table: &str,
    column: &str,
    enum_name: &str,
    substitute: Option<&str>,
) -> Result<(), CliError> {
    let mut db = super::connect(config)?;
    let swap = db.swap_column_to_enum(table, column, enum_name, substitute)?;

    for sql in &swap.statements {
        println!("{}", output::statement(sql));
    }
    if !swap.replaced.is_empty() {
        println!(
            "  {} {} -> {}",
            output::label("Replaced"),
            swap.replaced.join(", "),
            substitute.unwrap_or_default()
        );
    }
    println!(
        "{}",
        output::success(&format!("✓ {table}.{column} now uses {enum_name}"))
    );
    Ok(())
}
