//! Tabula Migrations - column-set migrations for live PostgreSQL tables
//!
//! This crate provides:
//! - A [`ColumnSet`] model keyed by stable column ids
//! - A planner that diffs two column sets into ordered DDL ([`plan`])
//! - A transactional executor with an explicit truncate-and-retry fallback
//! - Catalog inspection and an enum lifecycle manager with a shadow-column swap
//!
//! # Usage
//!
//! ```ignore
//! use tabula_migrations::{ColumnSpec, Database, MigrationOutcome};
//!
//! let client = postgres::Client::connect(&url, postgres::NoTls)?;
//! let mut db = Database::new(client);
//!
//! let old = db.current_columns("people")?;
//! let mut new = old.clone();
//! new.insert(99, ColumnSpec::text("nickname", Some(32)));
//!
//! match db.alter_table("people", "people", &old, &new)? {
//!     MigrationOutcome::Applied { statements } => println!("{statements:#?}"),
//!     MigrationOutcome::AppliedAfterTruncate { first_error, .. } => {
//!         eprintln!("table was emptied after: {first_error}")
//!     }
//! }
//! ```
//!
//! # Dry runs
//!
//! [`plan`] is pure: give it both snapshots and a [`PlanContext`] and render
//! the result with [`Plan::statements`].
//!
//! # Features
//!
//! - `postgres-sync`: implements [`Session`] for `postgres::Client`
//! - `tracing`: emits `tracing` events for executed SQL and transactions

pub mod catalog;
pub mod column;
pub mod database;
pub mod ddl;
pub mod enums;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod planner;
pub mod session;
mod trace;

pub use catalog::{Catalog, ColumnInfo, PrimaryKey, TableMetadata};
pub use column::{ColumnId, ColumnSet, ColumnSpec, ColumnType};
pub use database::Database;
pub use ddl::Ddl;
pub use enums::EnumSwap;
pub use error::{ErrorKind, MigrationError, Result};
pub use executor::{MigrationOptions, MigrationOutcome, RetryPolicy};
pub use planner::{Plan, PlanContext, PlanStep, plan};
pub use session::{Session, TextRow};

// Re-export serde_json for callers building editor payloads
pub use serde_json;
