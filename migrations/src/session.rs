//! Blocking database session used by the catalog, executor and enum manager.

use crate::error::Result;

/// One result row, every column read as text (`NULL` is `None`).
pub type TextRow = Vec<Option<String>>;

/// A single blocking database session.
///
/// Parameters are always bound as text; queries cast every selected column to
/// `text` so rows can be read without type-specific decoding.
pub trait Session {
    /// Run one or more statements without parameters.
    fn batch(&mut self, sql: &str) -> Result<()>;

    /// Run one statement, returning the number of rows affected.
    fn execute(&mut self, sql: &str, params: &[&str]) -> Result<u64>;

    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<TextRow>>;

    fn begin(&mut self) -> Result<()> {
        self.batch("BEGIN")
    }

    fn commit(&mut self) -> Result<()> {
        self.batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<()> {
        self.batch("ROLLBACK")
    }

    /// Whether `sql` returns at least one row.
    fn exists(&mut self, sql: &str, params: &[&str]) -> Result<bool> {
        Ok(!self.query(sql, params)?.is_empty())
    }
}

impl<S: Session + ?Sized> Session for &mut S {
    fn batch(&mut self, sql: &str) -> Result<()> {
        (**self).batch(sql)
    }

    fn execute(&mut self, sql: &str, params: &[&str]) -> Result<u64> {
        (**self).execute(sql, params)
    }

    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<TextRow>> {
        (**self).query(sql, params)
    }

    fn begin(&mut self) -> Result<()> {
        (**self).begin()
    }

    fn commit(&mut self) -> Result<()> {
        (**self).commit()
    }

    fn rollback(&mut self) -> Result<()> {
        (**self).rollback()
    }

    fn exists(&mut self, sql: &str, params: &[&str]) -> Result<bool> {
        (**self).exists(sql, params)
    }
}

#[cfg(feature = "postgres-sync")]
mod postgres_sync {
    use super::{Session, TextRow};
    use crate::error::Result;
    use postgres::types::ToSql;

    fn bind<'a>(params: &'a [&'a str]) -> Vec<&'a (dyn ToSql + Sync)> {
        params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
    }

    impl Session for postgres::Client {
        fn batch(&mut self, sql: &str) -> Result<()> {
            crate::tabula_trace_sql!(sql, 0);
            self.batch_execute(sql)?;
            Ok(())
        }

        fn execute(&mut self, sql: &str, params: &[&str]) -> Result<u64> {
            crate::tabula_trace_sql!(sql, params.len());
            Ok(postgres::Client::execute(self, sql, &bind(params))?)
        }

        fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<TextRow>> {
            crate::tabula_trace_sql!(sql, params.len());
            let rows = postgres::Client::query(self, sql, &bind(params))?;
            rows.iter()
                .map(|row| {
                    (0..row.len())
                        .map(|i| row.try_get::<_, Option<String>>(i).map_err(Into::into))
                        .collect::<Result<TextRow>>()
                })
                .collect()
        }

        // Probe rows are never decoded, so `SELECT 1` works without a text cast.
        fn exists(&mut self, sql: &str, params: &[&str]) -> Result<bool> {
            crate::tabula_trace_sql!(sql, params.len());
            Ok(!postgres::Client::query(self, sql, &bind(params))?.is_empty())
        }
    }
}
