//! Inspect command implementation
//!
//! Shows one table's columns and constraints, or prints its column set as JSON
//! in the shape `alter --desired` reads back.

use colored::Colorize;

use crate::config::Config;
use crate::error::CliError;
use crate::output;

/// Run the inspect command
pub fn run(config: &Config, table: &str, json: bool) -> Result<(), CliError> {
    let mut db = super::connect(config)?;

    if json {
        let columns = db.current_columns(table)?;
        let text = serde_json::to_string_pretty(&columns)
            .map_err(|e| CliError::Other(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    let meta = db.table(table)?.clone();
    println!("{}", output::heading(&format!("Table {}", meta.name)));
    println!();

    for col in &meta.columns {
        let mut flags = Vec::new();
        if meta.is_primary_key(&col.name) {
            flags.push("primary key".to_string());
        }
        if col.not_null {
            flags.push("not null".to_string());
        }
        if let Some(u) = meta.unique_constraint(&col.name) {
            flags.push(format!("unique ({})", u.name));
        }
        if let Some(default) = &col.default {
            flags.push(format!("default {default}"));
        }
        println!(
            "  {} {:<24} {:<28} {}",
            format!("{:>3}", col.ordinal).bright_black(),
            col.name,
            output::label(&col.data_type),
            output::muted(&flags.join(", "))
        );
    }

    if let Some(pk) = &meta.primary_key {
        println!();
        println!("  {}: {} ({})", output::label("Primary key"), pk.name, pk.columns.join(", "));
    }
    for fk in &meta.foreign_keys {
        println!(
            "  {}: {} ({}) -> {} ({})",
            output::label("Foreign key"),
            fk.name,
            fk.columns.join(", "),
            fk.ref_table,
            fk.ref_columns.join(", ")
        );
    }
    for check in &meta.checks {
        println!("  {}: {} {}", output::label("Check"), check.name, check.expression);
    }
    Ok(())
}
