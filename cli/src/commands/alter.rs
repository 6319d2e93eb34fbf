//! Alter command implementation
//!
//! Migrates a live table to the column set stored in a JSON file.

use std::path::Path;

use tabula_migrations::{ColumnSet, MigrationOutcome, PlanStep};

use crate::config::Config;
use crate::error::CliError;
use crate::output;

/// Read a desired column set from `path`.
pub fn read_column_set(path: &Path) -> Result<ColumnSet, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| CliError::InvalidColumnSet {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Run the alter command
pub fn run(
    config: &Config,
    table: &str,
    desired: &Path,
    rename: Option<&str>,
    dry_run: bool,
) -> Result<(), CliError> {
    let new = read_column_set(desired)?;
    let new_table = rename.unwrap_or(table);

    let mut db = super::connect(config)?;
    let old = db.current_columns(table)?;

    if dry_run {
        let plan = db.plan_alter(table, new_table, &old, &new)?;
        if plan.is_empty() {
            println!("{}", output::success("No changes detected"));
            return Ok(());
        }
        println!("{}", output::heading("Planned statements (dry run)"));
        for step in &plan.steps {
            match step {
                PlanStep::Ddl(ddl) => println!("{}", output::statement(&ddl.to_sql())),
                PlanStep::AddColumnIfEmpty {
                    when_empty,
                    otherwise,
                    ..
                } => {
                    println!("{}", output::statement(&when_empty.to_sql()));
                    println!(
                        "    {}",
                        output::muted(&format!("if the table has rows: {}", otherwise.to_sql()))
                    );
                }
                PlanStep::AssertNoNulls { column, .. } => println!(
                    "    {}",
                    output::muted(&format!("fails if \"{column}\" holds NULL"))
                ),
            }
        }
        return Ok(());
    }

    let outcome = db.alter_table(table, new_table, &old, &new)?;
    if outcome.statements().is_empty() {
        println!("{}", output::success("No changes detected"));
        return Ok(());
    }

    println!("{}", output::heading("Applied statements"));
    for sql in outcome.statements() {
        println!("{}", output::statement(sql));
    }
    if let MigrationOutcome::AppliedAfterTruncate { first_error, .. } = &outcome {
        println!();
        println!(
            "{}",
            output::banner_warning(&format!(
                "all rows of \"{new_table}\" were deleted to apply the change ({first_error})"
            ))
        );
    }
    println!();
    println!("{}", output::success(&format!("✓ {new_table} is up to date")));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_migrations::ColumnType;

    #[test]
    fn reads_editor_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("people.json");
        std::fs::write(
            &path,
            r#"{
                "1": { "name": "id", "type": "INTEGER", "primary_key": true },
                "2": { "name": "nick", "type": "TEXT", "length": 0, "default": 5, "check": "" }
            }"#,
        )
        .unwrap();

        let set = read_column_set(&path).unwrap();
        assert!(set[&1].primary_key);
        assert_eq!(set[&2].column_type, ColumnType::Text);
        assert_eq!(set[&2].length, None);
        assert_eq!(set[&2].default.as_deref(), Some("5"));
        assert_eq!(set[&2].check, None);
    }

    #[test]
    fn rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{ "1": { "type": "INTEGER" } }"#).unwrap();
        assert!(matches!(
            read_column_set(&path),
            Err(CliError::InvalidColumnSet { .. })
        ));
    }
}
