//! # Tabula
//!
//! Declarative column-set migrations for live PostgreSQL tables.
//!
//! Describe the columns a table should have, keyed by stable column ids, and
//! Tabula works out the ordered `ALTER TABLE` statements, runs them in one
//! transaction and reloads its view of the catalog afterwards.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tabula::{ColumnSpec, Database, MigrationOutcome};
//!
//! let client = tabula::postgres::Client::connect(&url, tabula::postgres::NoTls)?;
//! let mut db = Database::new(client);
//!
//! let old = db.current_columns("people")?;
//! let mut new = old.clone();
//! new.insert(100, ColumnSpec::text("nickname", Some(32)).unique());
//!
//! if let MigrationOutcome::AppliedAfterTruncate { first_error, .. } =
//!     db.alter_table("people", "people", &old, &new)?
//! {
//!     eprintln!("rows were deleted to apply the change: {first_error}");
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature         | Effect                                        |
//! |-----------------|-----------------------------------------------|
//! | `postgres-sync` | `postgres::Client` implements [`Session`]     |
//! | `tracing`       | `tracing` events for SQL and transactions     |

pub use tabula_migrations::*;

#[cfg(feature = "postgres-sync")]
pub use postgres;
