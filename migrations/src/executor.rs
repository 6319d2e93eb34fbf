//! Transactional executor
//!
//! Runs a [`Plan`] inside one transaction. When the first attempt fails and the
//! [`RetryPolicy`] allows it, the table is truncated and the plan is run again
//! in a fresh transaction. Callers must not migrate the same table from two
//! sessions at once.

use crate::error::{MigrationError, Result};
use crate::normalize::quote_ident;
use crate::planner::{Plan, PlanStep};
use crate::session::Session;
use crate::ddl::Ddl;

/// What to do when the first attempt fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetryPolicy {
    /// Roll back, empty the table, run the plan once more. Destroys rows.
    #[default]
    TruncateAndRetry,
    /// Roll back and report the error.
    FailFast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationOptions {
    pub retry: RetryPolicy,
}

impl MigrationOptions {
    pub fn fail_fast() -> Self {
        Self {
            retry: RetryPolicy::FailFast,
        }
    }
}

/// A committed migration.
#[derive(Debug, Clone, PartialEq)]
pub enum MigrationOutcome {
    /// The first attempt committed.
    Applied { statements: Vec<String> },
    /// The first attempt failed with `first_error`; the table was emptied and
    /// the retry committed. Every row that existed before is gone.
    AppliedAfterTruncate {
        statements: Vec<String>,
        first_error: MigrationError,
    },
}

impl MigrationOutcome {
    pub fn statements(&self) -> &[String] {
        match self {
            Self::Applied { statements } | Self::AppliedAfterTruncate { statements, .. } => {
                statements
            }
        }
    }

    pub fn table_was_emptied(&self) -> bool {
        matches!(self, Self::AppliedAfterTruncate { .. })
    }
}

/// Run `f` between `BEGIN` and `COMMIT`, rolling back when it fails.
///
/// A failed rollback is logged; the error from `f` is what the caller sees.
pub fn transaction<S, F, R>(session: &mut S, table: &str, f: F) -> Result<R>
where
    S: Session + ?Sized,
    F: FnOnce(&mut S) -> Result<R>,
{
    crate::tabula_trace_tx!("begin", table);
    session.begin()?;
    let result = f(session).and_then(|value| {
        crate::tabula_trace_tx!("commit", table);
        session.commit()?;
        Ok(value)
    });
    if result.is_err() {
        crate::tabula_trace_tx!("rollback", table);
        if let Err(e) = session.rollback() {
            crate::tabula_warn!("rollback failed", table = %table, error = %e);
        }
    }
    result
}

fn run<S: Session + ?Sized>(session: &mut S, ddl: &Ddl, executed: &mut Vec<String>) -> Result<()> {
    let sql = ddl.to_sql();
    session.batch(&sql)?;
    executed.push(sql);
    Ok(())
}

/// Execute every step of `plan` in the current transaction, returning the
/// statements that ran.
pub fn apply<S: Session + ?Sized>(session: &mut S, plan: &Plan) -> Result<Vec<String>> {
    let mut executed = Vec::new();
    for step in &plan.steps {
        match step {
            PlanStep::Ddl(ddl) => run(session, ddl, &mut executed)?,
            PlanStep::AddColumnIfEmpty {
                table,
                when_empty,
                otherwise,
            } => {
                let probe = format!("SELECT 1 FROM {} LIMIT 1", quote_ident(table));
                let has_rows = session.exists(&probe, &[])?;
                if has_rows {
                    crate::tabula_warn!("table has rows, NOT NULL deferred", table = %table);
                }
                run(session, if has_rows { otherwise } else { when_empty }, &mut executed)?;
            }
            PlanStep::AssertNoNulls { table, column } => {
                let probe = format!(
                    "SELECT 1 FROM {} WHERE {} IS NULL LIMIT 1",
                    quote_ident(table),
                    quote_ident(column)
                );
                if session.exists(&probe, &[])? {
                    return Err(MigrationError::ConstraintViolation(format!(
                        "column \"{column}\" of relation \"{table}\" contains null values"
                    )));
                }
            }
        }
    }
    Ok(executed)
}

/// Apply `plan` transactionally, with the truncate-and-retry fallback when
/// `options` allow it.
///
/// On failure the error of the first attempt is returned and no structural
/// change is committed.
pub fn migrate<S: Session + ?Sized>(
    session: &mut S,
    plan: &Plan,
    options: &MigrationOptions,
) -> Result<MigrationOutcome> {
    let first_error = match transaction(session, &plan.old_table, |s| apply(s, plan)) {
        Ok(statements) => return Ok(MigrationOutcome::Applied { statements }),
        Err(e) => e,
    };
    if options.retry == RetryPolicy::FailFast {
        return Err(first_error);
    }

    crate::tabula_trace_tx!("retry", &plan.old_table);
    crate::tabula_warn!(
        "migration failed, retrying on an emptied table",
        table = %plan.old_table,
        error = %first_error
    );
    let retried = transaction(session, &plan.old_table, |s| {
        let truncate = Ddl::TruncateCascade {
            table: plan.old_table.clone(),
        };
        s.batch(&truncate.to_sql())?;
        apply(s, plan)
    });
    match retried {
        Ok(statements) => Ok(MigrationOutcome::AppliedAfterTruncate {
            statements,
            first_error,
        }),
        Err(_) => Err(first_error),
    }
}
