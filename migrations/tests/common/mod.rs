//! Scripted in-memory `Session` for driving the engine without a database.
#![allow(dead_code)]

use tabula_migrations::{MigrationError, Result, Session, TextRow};

/// One statement seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub sql: String,
    pub params: Vec<String>,
}

struct Failure {
    pattern: String,
    error: MigrationError,
    remaining: Option<usize>,
}

/// Answers queries by substring match and fails statements on demand.
#[derive(Default)]
pub struct MockSession {
    responses: Vec<(String, Vec<TextRow>)>,
    failures: Vec<Failure>,
    pub calls: Vec<Call>,
    /// SQL seen by `exists`, which a driver may answer without decoding rows.
    pub probes: Vec<String>,
    pub transactions: usize,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queries containing `pattern` return `rows`. Later rules win.
    pub fn respond(mut self, pattern: &str, rows: Vec<Vec<Option<&str>>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.map(str::to_string)).collect())
            .collect();
        self.responses.insert(0, (pattern.to_string(), rows));
        self
    }

    /// Statements containing `pattern` fail with `error` the next `times` runs.
    pub fn fail(mut self, pattern: &str, error: MigrationError, times: Option<usize>) -> Self {
        self.failures.push(Failure {
            pattern: pattern.to_string(),
            error,
            remaining: times,
        });
        self
    }

    pub fn fail_once(self, pattern: &str, error: MigrationError) -> Self {
        self.fail(pattern, error, Some(1))
    }

    pub fn fail_always(self, pattern: &str, error: MigrationError) -> Self {
        self.fail(pattern, error, None)
    }

    /// Every SQL text in order, including `BEGIN`/`COMMIT`/`ROLLBACK`.
    pub fn log(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.sql.as_str()).collect()
    }

    /// Statements other than catalog reads and probes.
    pub fn statements(&self) -> Vec<&str> {
        self.log()
            .into_iter()
            .filter(|sql| !sql.trim_start().starts_with("SELECT"))
            .collect()
    }

    fn record(&mut self, sql: &str, params: &[&str]) -> Result<()> {
        self.calls.push(Call {
            sql: sql.to_string(),
            params: params.iter().map(|p| p.to_string()).collect(),
        });
        for failure in &mut self.failures {
            if !sql.contains(&failure.pattern) {
                continue;
            }
            match &mut failure.remaining {
                Some(0) => continue,
                Some(n) => *n -= 1,
                None => {}
            }
            return Err(failure.error.clone());
        }
        Ok(())
    }
}

impl Session for MockSession {
    fn batch(&mut self, sql: &str) -> Result<()> {
        self.record(sql, &[])
    }

    fn execute(&mut self, sql: &str, params: &[&str]) -> Result<u64> {
        self.record(sql, params)?;
        Ok(0)
    }

    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<TextRow>> {
        self.record(sql, params)?;
        Ok(self
            .responses
            .iter()
            .find(|(pattern, _)| sql.contains(pattern.as_str()))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default())
    }

    fn begin(&mut self) -> Result<()> {
        self.transactions += 1;
        self.batch("BEGIN")
    }

    fn exists(&mut self, sql: &str, params: &[&str]) -> Result<bool> {
        self.probes.push(sql.to_string());
        Ok(!self.query(sql, params)?.is_empty())
    }
}

/// Responses describing one table for the catalog queries.
///
/// `columns` rows: `(attnum, name, format_type, not_null, default, enum_name)`.
pub fn with_table(
    session: MockSession,
    columns: &[(&str, &str, &str, bool, Option<&str>, Option<&str>)],
) -> MockSession {
    let rows = columns
        .iter()
        .map(|(num, name, ty, not_null, default, enum_name)| {
            vec![
                Some(*num),
                Some(*name),
                Some(*ty),
                Some(if *not_null { "true" } else { "false" }),
                *default,
                *enum_name,
            ]
        })
        .collect();
    session
        .respond("to_regclass($1::text)::text", vec![vec![Some("t")]])
        .respond("pg_catalog.format_type", rows)
}

pub fn constraint_violation(msg: &str) -> MigrationError {
    MigrationError::ConstraintViolation(msg.to_string())
}
