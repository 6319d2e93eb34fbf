//! The `Database` context: one session, one catalog cache, migration options.

use crate::catalog::{self, Catalog, PrimaryKey, TableMetadata};
use crate::column::ColumnSet;
use crate::enums::{self, EnumSwap};
use crate::error::Result;
use crate::executor::{self, MigrationOptions, MigrationOutcome};
use crate::normalize::quote_ident;
use crate::planner::{self, Plan, PlanContext};
use crate::session::Session;
use std::collections::BTreeMap;

/// Entry point for inspection, migration and enum management on one session.
///
/// The catalog cache is not shared; use one `Database` per thread.
pub struct Database<S: Session> {
    session: S,
    catalog: Catalog,
    options: MigrationOptions,
}

impl<S: Session> Database<S> {
    pub fn new(session: S) -> Self {
        Self::with_options(session, MigrationOptions::default())
    }

    pub fn with_options(session: S, options: MigrationOptions) -> Self {
        Self {
            session,
            catalog: Catalog::new(),
            options,
        }
    }

    pub fn options(&self) -> &MigrationOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: MigrationOptions) {
        self.options = options;
    }

    pub fn session(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    pub fn table(&mut self, name: &str) -> Result<&TableMetadata> {
        self.catalog.get(&mut self.session, name)
    }

    /// Invalidate and reload cached metadata.
    pub fn refresh(&mut self, tables: &[&str], force_clear: bool) -> Result<()> {
        self.catalog.refresh(&mut self.session, tables, force_clear)
    }

    pub fn list_tables(&mut self) -> Result<Vec<String>> {
        catalog::list_tables(&mut self.session)
    }

    /// Column sets covered by each unique constraint of `table`.
    pub fn unique_constraints(&mut self, table: &str) -> Result<Vec<Vec<String>>> {
        Ok(self
            .table(table)?
            .uniques
            .iter()
            .map(|u| u.columns.clone())
            .collect())
    }

    pub fn primary_key(&mut self, table: &str) -> Result<Option<PrimaryKey>> {
        Ok(self.table(table)?.primary_key.clone())
    }

    pub fn column_enum_name(&mut self, table: &str, column: &str) -> Result<Option<String>> {
        catalog::column_enum_name(&mut self.session, table, column)
    }

    pub fn list_enums(&mut self) -> Result<BTreeMap<String, Vec<String>>> {
        catalog::list_enums(&mut self.session)
    }

    pub fn enum_values(&mut self, name: &str) -> Result<Vec<String>> {
        catalog::enum_values(&mut self.session, name)
    }

    /// The table's current structure, keyed by catalog ordinal.
    pub fn current_columns(&mut self, table: &str) -> Result<ColumnSet> {
        Ok(self.table(table)?.to_column_set())
    }

    // -------------------------------------------------------------------------
    // Migration
    // -------------------------------------------------------------------------

    /// Plan without executing. Constraint names come from a fresh catalog read.
    pub fn plan_alter(
        &mut self,
        old_table: &str,
        new_table: &str,
        old: &ColumnSet,
        new: &ColumnSet,
    ) -> Result<Plan> {
        planner::validate(old_table, new_table, old, new)?;
        self.catalog.invalidate(old_table);
        let ctx = PlanContext::from_metadata(self.table(old_table)?);
        planner::plan(old_table, new_table, old, new, &ctx)
    }

    /// Plan and apply a column-set change.
    ///
    /// The catalog cache for both table names is reloaded afterwards whatever
    /// the result; a failed reload is logged and does not change the result.
    pub fn alter_table(
        &mut self,
        old_table: &str,
        new_table: &str,
        old: &ColumnSet,
        new: &ColumnSet,
    ) -> Result<MigrationOutcome> {
        let plan = self.plan_alter(old_table, new_table, old, new)?;
        let result = if plan.is_empty() {
            Ok(MigrationOutcome::Applied {
                statements: Vec::new(),
            })
        } else {
            executor::migrate(&mut self.session, &plan, &self.options)
        };
        self.resync(&[old_table, new_table]);
        result
    }

    fn resync(&mut self, tables: &[&str]) {
        if let Err(e) = self.refresh(tables, false) {
            crate::tabula_warn!("catalog resync failed", error = %e);
        }
    }

    // -------------------------------------------------------------------------
    // Enums
    // -------------------------------------------------------------------------

    pub fn create_enum(&mut self, name: &str, labels: &[String]) -> Result<()> {
        enums::create_enum(&mut self.session, name, labels)
    }

    pub fn drop_enum(&mut self, name: &str, cascade: bool) -> Result<()> {
        let result = enums::drop_enum(&mut self.session, name, cascade);
        if cascade {
            self.catalog.clear();
        }
        result
    }

    pub fn find_incompatible_values(
        &mut self,
        table: &str,
        column: &str,
        enum_name: &str,
    ) -> Result<Vec<String>> {
        enums::find_incompatible_values(&mut self.session, table, column, enum_name)
    }

    pub fn swap_column_to_enum(
        &mut self,
        table: &str,
        column: &str,
        enum_name: &str,
        substitute: Option<&str>,
    ) -> Result<EnumSwap> {
        let result =
            enums::swap_column_to_enum(&mut self.session, table, column, enum_name, substitute);
        self.resync(&[table]);
        result
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    /// For each uniquely constrained column with a non-null candidate value,
    /// report whether that value is already taken.
    ///
    /// Returns column name -> message for every conflict.
    pub fn check_uniques(
        &mut self,
        table: &str,
        values: &BTreeMap<String, serde_json::Value>,
    ) -> Result<BTreeMap<String, String>> {
        let columns: Vec<String> = {
            let meta = self.table(table)?;
            meta.columns
                .iter()
                .filter(|c| meta.unique_constraint(&c.name).is_some() || meta.is_primary_key(&c.name))
                .map(|c| c.name.clone())
                .collect()
        };

        let mut conflicts = BTreeMap::new();
        for column in columns {
            let Some(raw) = values.get(&column) else {
                continue;
            };
            let candidate = match raw {
                serde_json::Value::Null => continue,
                serde_json::Value::String(s) if s.trim().is_empty() => continue,
                serde_json::Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            };
            let sql = format!(
                "SELECT 1 FROM {} WHERE {}::text = $1 LIMIT 1",
                quote_ident(table),
                quote_ident(&column)
            );
            if self.session.exists(&sql, &[candidate.as_str()])? {
                conflicts.insert(column, "value must be unique".to_string());
            }
        }
        Ok(conflicts)
    }
}

impl<S: Session> std::fmt::Debug for Database<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("catalog", &self.catalog)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
