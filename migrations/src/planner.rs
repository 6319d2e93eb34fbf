//! Schema diff planner
//!
//! Compares two column sets keyed by column id and produces an ordered
//! [`Plan`]. Order:
//!
//! 1. table rename
//! 2. dropped columns (foreign key, unique, column)
//! 3. created columns (add, unique)
//! 4. changed columns, one at a time: rename, type, primary key drop,
//!    nullability, unique, default, check, foreign key
//! 5. primary key add
//!
//! Everything after the table rename addresses the table by its new name.

use crate::catalog::{PrimaryKey, TableMetadata};
use crate::column::{
    ColumnSet, ColumnSpec, ColumnType, check_constraint_name, foreign_key_name, primary_key_name,
    unique_constraint_name,
};
use crate::ddl::{ColumnDef, Ddl, Reference};
use crate::error::{MigrationError, Result};
use crate::normalize::{quote_ident, validate_identifier};
use std::collections::{HashMap, HashSet};

/// Live constraint names captured before planning.
///
/// Drops use these names when known; otherwise they fall back to the naming
/// convention with `IF EXISTS`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanContext {
    pub primary_key: Option<PrimaryKey>,
    /// column name -> single-column unique constraint name
    pub uniques: HashMap<String, String>,
    pub foreign_keys: HashMap<String, String>,
    pub checks: HashMap<String, String>,
}

impl PlanContext {
    pub fn from_metadata(meta: &TableMetadata) -> Self {
        let single = |columns: &[String]| (columns.len() == 1).then(|| columns[0].clone());
        Self {
            primary_key: meta.primary_key.clone(),
            uniques: meta
                .uniques
                .iter()
                .filter_map(|u| Some((single(&u.columns)?, u.name.clone())))
                .collect(),
            foreign_keys: meta
                .foreign_keys
                .iter()
                .filter_map(|fk| Some((single(&fk.columns)?, fk.name.clone())))
                .collect(),
            checks: meta
                .checks
                .iter()
                .filter_map(|c| Some((single(&c.columns)?, c.name.clone())))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Ddl(Ddl),
    /// Add a `NOT NULL` column without a default: inline `NOT NULL` only when
    /// the table has no rows.
    AddColumnIfEmpty {
        table: String,
        when_empty: Ddl,
        otherwise: Ddl,
    },
    /// Fail the migration if `column` holds any `NULL`.
    AssertNoNulls { table: String, column: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Table name before the migration
    pub old_table: String,
    /// Table name after the migration
    pub table: String,
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Statements assuming the table holds rows (deferred `NOT NULL`).
    pub fn statements(&self) -> Vec<String> {
        self.render(false)
    }

    pub fn statements_for_empty_table(&self) -> Vec<String> {
        self.render(true)
    }

    fn render(&self, table_empty: bool) -> Vec<String> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                PlanStep::Ddl(ddl) => Some(ddl.to_sql()),
                PlanStep::AddColumnIfEmpty {
                    when_empty,
                    otherwise,
                    ..
                } => Some(if table_empty { when_empty } else { otherwise }.to_sql()),
                PlanStep::AssertNoNulls { .. } => None,
            })
            .collect()
    }
}

/// Primary key as seen while planning.
struct PkState {
    live: Option<PrimaryKey>,
    /// Whether `live.name` comes from the catalog
    known: bool,
    dropped: bool,
}

impl PkState {
    fn new(ctx: &PlanContext, old_table: &str, old: &ColumnSet) -> Self {
        if let Some(pk) = &ctx.primary_key {
            return Self {
                live: Some(pk.clone()),
                known: true,
                dropped: false,
            };
        }
        let live = old.values().find(|c| c.primary_key).map(|c| PrimaryKey {
            name: primary_key_name(old_table),
            columns: vec![c.name.clone()],
        });
        Self {
            live,
            known: false,
            dropped: false,
        }
    }

    fn covers(&self, column: &str) -> bool {
        !self.dropped
            && self
                .live
                .as_ref()
                .is_some_and(|pk| pk.columns.iter().any(|c| c == column))
    }

    fn is_exactly(&self, column: &str) -> bool {
        !self.dropped
            && self
                .live
                .as_ref()
                .is_some_and(|pk| pk.columns.len() == 1 && pk.columns[0] == column)
    }

    fn drop_ddl(&mut self, table: &str) -> Option<Ddl> {
        if self.dropped {
            return None;
        }
        let pk = self.live.as_ref()?;
        self.dropped = true;
        Some(Ddl::DropConstraint {
            table: table.to_string(),
            name: pk.name.clone(),
            if_exists: !self.known,
        })
    }
}

struct Planner<'a> {
    ctx: &'a PlanContext,
    old_table: &'a str,
    table: &'a str,
    steps: Vec<PlanStep>,
    pk: PkState,
}

impl Planner<'_> {
    fn push(&mut self, ddl: Ddl) {
        self.steps.push(PlanStep::Ddl(ddl));
    }

    /// Drop a per-column constraint by its live name, or by convention.
    fn drop_named(&mut self, live: Option<String>, convention: String) {
        let (name, if_exists) = match live {
            Some(name) => (name, false),
            None => (convention, true),
        };
        self.push(Ddl::DropConstraint {
            table: self.table.to_string(),
            name,
            if_exists,
        });
    }

    fn drop_unique(&mut self, old_name: &str) {
        let live = self.ctx.uniques.get(old_name).cloned();
        self.drop_named(live, unique_constraint_name(self.old_table, old_name));
    }

    fn drop_foreign_key(&mut self, old_name: &str) {
        let live = self.ctx.foreign_keys.get(old_name).cloned();
        self.drop_named(live, foreign_key_name(self.old_table, old_name));
    }

    fn drop_check(&mut self, old_name: &str) {
        let live = self.ctx.checks.get(old_name).cloned();
        self.drop_named(live, check_constraint_name(self.old_table, old_name));
    }

    fn add_unique(&mut self, column: &str) {
        self.push(Ddl::AddUnique {
            table: self.table.to_string(),
            name: unique_constraint_name(self.table, column),
            column: column.to_string(),
        });
    }

    fn reference(&self, column: &str, spec: &ColumnSpec) -> Option<Reference> {
        let (table, ref_column) = spec.foreign_key()?;
        Some(Reference {
            name: foreign_key_name(self.table, column),
            table: table.to_string(),
            column: ref_column.to_string(),
        })
    }

    fn drop_column(&mut self, col: &ColumnSpec) {
        if col.foreign_key().is_some() || self.ctx.foreign_keys.contains_key(&col.name) {
            self.drop_foreign_key(&col.name);
        }
        if col.effective_unique() || self.ctx.uniques.contains_key(&col.name) {
            self.drop_unique(&col.name);
        }
        // PostgreSQL drops the primary key together with any of its columns.
        if self.pk.covers(&col.name) {
            self.pk.dropped = true;
        }
        self.push(Ddl::DropColumn {
            table: self.table.to_string(),
            column: col.name.clone(),
            cascade: true,
        });
    }

    fn create_column(&mut self, col: &ColumnSpec) -> Result<()> {
        let default = col.default_sql();
        let def = ColumnDef {
            name: col.name.clone(),
            sql_type: col.sql_type()?,
            not_null: col.effective_not_null() && default.is_some(),
            default,
            check: col
                .check_sql()
                .map(|p| (check_constraint_name(self.table, &col.name), p)),
            references: self.reference(&col.name, col),
        };
        let table = self.table;
        let add = |column: ColumnDef| Ddl::AddColumn {
            table: table.to_string(),
            column,
        };
        if col.effective_not_null() && !def.not_null {
            let when_empty = add(ColumnDef {
                not_null: true,
                ..def.clone()
            });
            let step = PlanStep::AddColumnIfEmpty {
                table: self.table.to_string(),
                when_empty,
                otherwise: add(def),
            };
            self.steps.push(step);
        } else {
            let ddl = add(def);
            self.push(ddl);
        }
        if col.effective_unique() {
            self.add_unique(&col.name);
        }
        Ok(())
    }

    fn alter_column(&mut self, old: &ColumnSpec, new: &ColumnSpec) -> Result<()> {
        let table = self.table.to_string();
        let column = new.name.clone();

        if old.name != new.name {
            self.push(Ddl::RenameColumn {
                table: table.clone(),
                from: old.name.clone(),
                to: column.clone(),
            });
        }

        if old.type_differs(new) {
            let sql_type = new.sql_type()?;
            let using = cast_expression(old, new, &quote_ident(&column), &sql_type);
            self.push(Ddl::AlterType {
                table: table.clone(),
                column: column.clone(),
                sql_type,
                using: Some(using),
            });
        }

        // DROP NOT NULL is refused while the column is in the primary key.
        if old.primary_key && !new.primary_key && self.pk.covers(&old.name) {
            if let Some(ddl) = self.pk.drop_ddl(&table) {
                self.push(ddl);
            }
        }

        match (old.effective_not_null(), new.effective_not_null()) {
            (false, true) => {
                self.steps.push(PlanStep::AssertNoNulls {
                    table: table.clone(),
                    column: column.clone(),
                });
                self.push(Ddl::SetNotNull {
                    table: table.clone(),
                    column: column.clone(),
                });
            }
            (true, false) => self.push(Ddl::DropNotNull {
                table: table.clone(),
                column: column.clone(),
            }),
            _ => {}
        }

        match (old.effective_unique(), new.effective_unique()) {
            (true, false) => self.drop_unique(&old.name),
            (false, true) => self.add_unique(&column),
            _ => {}
        }

        if old.canonical_default() != new.canonical_default() {
            match new.default_sql() {
                Some(default) => self.push(Ddl::SetDefault {
                    table: table.clone(),
                    column: column.clone(),
                    default,
                }),
                None => self.push(Ddl::DropDefault {
                    table: table.clone(),
                    column: column.clone(),
                }),
            }
        }

        if old.canonical_check() != new.canonical_check() {
            if old.canonical_check().is_some() || self.ctx.checks.contains_key(&old.name) {
                self.drop_check(&old.name);
            }
            if let Some(predicate) = new.check_sql() {
                self.push(Ddl::AddCheck {
                    table: table.clone(),
                    name: check_constraint_name(&table, &column),
                    predicate,
                });
            }
        }

        if old.foreign_key() != new.foreign_key() {
            if old.foreign_key().is_some() || self.ctx.foreign_keys.contains_key(&old.name) {
                self.drop_foreign_key(&old.name);
            }
            if let Some(references) = self.reference(&column, new) {
                self.push(Ddl::AddForeignKey {
                    table,
                    column,
                    references,
                });
            }
        }
        Ok(())
    }

    /// `old_name` is `None` when the key column is created by this plan.
    fn add_primary_key(&mut self, old_name: Option<&str>, new_name: &str) {
        if old_name.is_some_and(|name| self.pk.is_exactly(name)) {
            return;
        }
        if let Some(ddl) = self.pk.drop_ddl(self.table) {
            self.push(ddl);
        }
        self.push(Ddl::AddPrimaryKey {
            table: self.table.to_string(),
            name: primary_key_name(self.table),
            column: new_name.to_string(),
        });
    }
}

/// `USING` expression converting `column` from the old type to `sql_type`.
fn cast_expression(old: &ColumnSpec, new: &ColumnSpec, column: &str, sql_type: &str) -> String {
    let (from_array, to_array) = (old.column_type.is_array(), new.column_type.is_array());
    if to_array && !from_array {
        return format!("ARRAY[{column}]::{sql_type}");
    }
    let source = if from_array && !to_array {
        format!("{column}[1]")
    } else {
        column.to_string()
    };
    if new.column_type == ColumnType::Enum {
        format!("{source}::text::{sql_type}")
    } else {
        format!("{source}::{sql_type}")
    }
}

/// Reject inputs that cannot be planned, before any catalog access.
pub fn validate(old_table: &str, new_table: &str, old: &ColumnSet, new: &ColumnSet) -> Result<()> {
    validate_identifier(old_table)?;
    validate_identifier(new_table)?;
    for col in old.values() {
        validate_identifier(&col.name)?;
    }
    let mut names = HashSet::new();
    for col in new.values() {
        col.validate()?;
        if !names.insert(col.name.as_str()) {
            return Err(MigrationError::invalid(format!(
                "duplicate column name {:?}",
                col.name
            )));
        }
    }
    if new.values().filter(|c| c.primary_key).count() > 1 {
        return Err(MigrationError::invalid(
            "only a single-column primary key is supported",
        ));
    }
    Ok(())
}

/// Compute the ordered plan turning `old` into `new`.
///
/// Validation runs first; an invalid input produces an error and no plan.
pub fn plan(
    old_table: &str,
    new_table: &str,
    old: &ColumnSet,
    new: &ColumnSet,
    ctx: &PlanContext,
) -> Result<Plan> {
    validate(old_table, new_table, old, new)?;

    let mut planner = Planner {
        ctx,
        old_table,
        table: new_table,
        steps: Vec::new(),
        pk: PkState::new(ctx, old_table, old),
    };

    if old_table != new_table {
        planner.push(Ddl::RenameTable {
            table: old_table.to_string(),
            to: new_table.to_string(),
        });
    }

    for (id, col) in old {
        if !new.contains_key(id) {
            planner.drop_column(col);
        }
    }

    for (id, col) in new {
        if !old.contains_key(id) {
            planner.create_column(col)?;
        }
    }

    for (id, old_col) in old {
        if let Some(new_col) = new.get(id) {
            planner.alter_column(old_col, new_col)?;
        }
    }

    if let Some((id, col)) = new.iter().find(|(_, c)| c.primary_key) {
        match old.get(id) {
            Some(prev) if prev.primary_key => {}
            prev => planner.add_primary_key(prev.map(|p| p.name.as_str()), &col.name),
        }
    }

    Ok(Plan {
        old_table: old_table.to_string(),
        table: new_table.to_string(),
        steps: planner.steps,
    })
}
