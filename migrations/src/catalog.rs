//! Catalog inspector
//!
//! Reads live table structure from `pg_catalog`. Queries return one text row
//! per element (column, constraint member, enum label); the `process_*`
//! functions turn those raw rows into [`TableMetadata`] without touching the
//! database, skipping anything they cannot interpret.

use crate::column::{ColumnSet, ColumnSpec, ColumnType};
use crate::error::{MigrationError, Result};
use crate::normalize::{check_predicate, parse_bool, quote_ident, validate_identifier};
use crate::session::{Session, TextRow};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// Queries
// =============================================================================

/// SQL queries for catalog inspection
pub mod queries {
    /// `$1` is the quoted table name.
    pub const TABLE_EXISTS: &str = "SELECT to_regclass($1::text)::text";

    pub const TABLES: &str = r#"
        SELECT c.relname::text
        FROM pg_catalog.pg_class c
        JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind IN ('r', 'p')
          AND n.nspname NOT LIKE 'pg_%'
          AND n.nspname <> 'information_schema'
          AND pg_catalog.pg_table_is_visible(c.oid)
        ORDER BY c.relname
    "#;

    pub const COLUMNS: &str = r#"
        SELECT
            a.attnum::text,
            a.attname::text,
            pg_catalog.format_type(a.atttypid, a.atttypmod),
            a.attnotnull::text,
            pg_catalog.pg_get_expr(d.adbin, d.adrelid),
            CASE WHEN t.typtype = 'e' THEN t.typname::text END
        FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
        LEFT JOIN pg_catalog.pg_attrdef d ON d.adrelid = a.attrelid AND d.adnum = a.attnum
        WHERE a.attrelid = to_regclass($1::text)
          AND a.attnum > 0
          AND NOT a.attisdropped
        ORDER BY a.attnum
    "#;

    /// One row per (constraint, member column).
    pub const CONSTRAINTS: &str = r#"
        SELECT
            c.conname::text,
            c.contype::text,
            pg_catalog.pg_get_constraintdef(c.oid, true),
            a.attname::text,
            k.ord::text,
            c.confrelid::regclass::text,
            fa.attname::text
        FROM pg_catalog.pg_constraint c
        CROSS JOIN LATERAL unnest(c.conkey) WITH ORDINALITY AS k(attnum, ord)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = c.conrelid AND a.attnum = k.attnum
        LEFT JOIN pg_catalog.pg_attribute fa
            ON fa.attrelid = c.confrelid AND fa.attnum = c.confkey[k.ord]
        WHERE c.conrelid = to_regclass($1::text)
          AND c.contype IN ('p', 'u', 'f', 'c')
        ORDER BY c.conname, k.ord
    "#;

    pub const ENUMS: &str = r#"
        SELECT t.typname::text, e.enumlabel::text
        FROM pg_catalog.pg_type t
        JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
        WHERE pg_catalog.pg_type_is_visible(t.oid)
        ORDER BY t.typname, e.enumsortorder
    "#;

    /// `$1` is the quoted enum name. Zero rows means no such enum; a single
    /// `NULL` label means an enum without labels.
    pub const ENUM_VALUES: &str = r#"
        SELECT e.enumlabel::text
        FROM pg_catalog.pg_type t
        LEFT JOIN pg_catalog.pg_enum e ON e.enumtypid = t.oid
        WHERE t.oid = to_regtype($1::text)
          AND t.typtype = 'e'
        ORDER BY e.enumsortorder
    "#;

    /// `$1` is the quoted table name, `$2` the column name.
    pub const COLUMN_ENUM_NAME: &str = r#"
        SELECT t.typname::text
        FROM pg_catalog.pg_attribute a
        JOIN pg_catalog.pg_type t ON t.oid = a.atttypid
        WHERE a.attrelid = to_regclass($1::text)
          AND a.attname = $2::text
          AND NOT a.attisdropped
          AND t.typtype = 'e'
    "#;
}

// =============================================================================
// Raw rows
// =============================================================================

#[derive(Debug, Clone)]
pub struct RawColumnInfo {
    pub ordinal: i64,
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    pub enum_name: Option<String>,
}

/// One member column of a constraint.
#[derive(Debug, Clone)]
pub struct RawConstraintInfo {
    pub name: String,
    /// `p`, `u`, `f` or `c`
    pub kind: String,
    pub definition: Option<String>,
    pub column: String,
    pub position: i64,
    pub ref_table: Option<String>,
    pub ref_column: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RawEnumLabel {
    pub enum_name: String,
    pub label: String,
}

fn cell(row: &TextRow, i: usize) -> Option<String> {
    row.get(i).cloned().flatten()
}

impl RawColumnInfo {
    fn from_row(row: &TextRow) -> Option<Self> {
        Some(Self {
            ordinal: cell(row, 0)?.parse().ok()?,
            name: cell(row, 1)?,
            data_type: cell(row, 2)?,
            not_null: parse_bool(cell(row, 3).as_deref()),
            default: cell(row, 4),
            enum_name: cell(row, 5),
        })
    }
}

impl RawConstraintInfo {
    fn from_row(row: &TextRow) -> Option<Self> {
        Some(Self {
            name: cell(row, 0)?,
            kind: cell(row, 1)?,
            definition: cell(row, 2),
            column: cell(row, 3)?,
            position: cell(row, 4)?.parse().ok()?,
            // `confrelid` is 0 for non-FK constraints, which regclass prints as `-`
            ref_table: cell(row, 5)
                .filter(|t| t != "-")
                .map(|t| t.replace('"', "")),
            ref_column: cell(row, 6),
        })
    }
}

// =============================================================================
// Metadata
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnInfo {
    /// Catalog ordinal (`attnum`), used as the column id
    pub ordinal: i64,
    pub name: String,
    /// Type as printed by `format_type`
    pub data_type: String,
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub array_elem_type: Option<String>,
    pub enum_name: Option<String>,
    pub not_null: bool,
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryKey {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckConstraint {
    pub name: String,
    pub columns: Vec<String>,
    /// Normalized predicate
    pub expression: String,
}

/// Structure of one table as read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMetadata {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub primary_key: Option<PrimaryKey>,
    pub uniques: Vec<UniqueConstraint>,
    pub foreign_keys: Vec<ForeignKey>,
    pub checks: Vec<CheckConstraint>,
}

impl TableMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_key
            .as_ref()
            .is_some_and(|pk| pk.columns.len() == 1 && pk.columns[0] == column)
    }

    pub fn unique_constraint(&self, column: &str) -> Option<&UniqueConstraint> {
        self.uniques.iter().find(|u| u.columns == [column])
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.columns == [column] && fk.ref_columns.len() == 1)
    }

    pub fn check(&self, column: &str) -> Option<&CheckConstraint> {
        self.checks.iter().find(|c| c.columns == [column])
    }

    /// The current structure as an editable column set, keyed by ordinal.
    ///
    /// Only single-column constraints map onto column flags; members of a
    /// composite primary key are reported as plain `NOT NULL` columns.
    pub fn to_column_set(&self) -> ColumnSet {
        self.columns
            .iter()
            .map(|col| {
                let fk = self.foreign_key(&col.name);
                let spec = ColumnSpec {
                    name: col.name.clone(),
                    column_type: col.column_type.clone(),
                    enum_name: col.enum_name.clone(),
                    length: col.length,
                    array_elem_type: col.array_elem_type.clone(),
                    not_null: col.not_null,
                    unique: self.unique_constraint(&col.name).is_some()
                        || self.is_primary_key(&col.name),
                    primary_key: self.is_primary_key(&col.name),
                    default: col.default.clone(),
                    check: self.check(&col.name).map(|c| c.expression.clone()),
                    fk_table: fk.map(|fk| fk.ref_table.clone()),
                    fk_column: fk.map(|fk| fk.ref_columns[0].clone()),
                };
                (col.ordinal, spec)
            })
            .collect()
    }
}

// =============================================================================
// Processing
// =============================================================================

/// Map a `format_type` string onto the coarse column type.
///
/// Returns `(type, length, array element type)`.
pub fn classify_type(data_type: &str, enum_name: Option<&str>) -> (ColumnType, Option<u32>, Option<String>) {
    if enum_name.is_some() {
        return (ColumnType::Enum, None, None);
    }
    if let Some(elem) = data_type.strip_suffix("[]") {
        return (ColumnType::Array, None, Some(elem.trim_matches('"').to_string()));
    }
    if let Some(rest) = data_type.strip_prefix("character varying") {
        let length = rest
            .trim()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .and_then(|n| n.trim().parse().ok());
        return (ColumnType::Text, length, None);
    }
    let column_type = match data_type {
        "integer" => ColumnType::Integer,
        "text" => ColumnType::Text,
        "real" => ColumnType::Real,
        "date" => ColumnType::Date,
        "boolean" => ColumnType::Boolean,
        other => ColumnType::Raw(other.to_string()),
    };
    (column_type, None, None)
}

pub fn process_columns(raw: &[RawColumnInfo]) -> Vec<ColumnInfo> {
    raw.iter()
        .map(|c| {
            let (column_type, length, array_elem_type) =
                classify_type(&c.data_type, c.enum_name.as_deref());
            ColumnInfo {
                ordinal: c.ordinal,
                name: c.name.clone(),
                data_type: c.data_type.clone(),
                column_type,
                length,
                array_elem_type,
                enum_name: c.enum_name.clone(),
                not_null: c.not_null,
                default: c.default.clone(),
            }
        })
        .collect()
}

/// Group constraint member rows by constraint name, keeping member order.
fn group_constraints(raw: &[RawConstraintInfo]) -> Vec<Vec<&RawConstraintInfo>> {
    let mut grouped: BTreeMap<&str, Vec<&RawConstraintInfo>> = BTreeMap::new();
    for row in raw {
        grouped.entry(row.name.as_str()).or_default().push(row);
    }
    grouped
        .into_values()
        .map(|mut members| {
            members.sort_by_key(|m| m.position);
            members
        })
        .collect()
}

fn member_columns(members: &[&RawConstraintInfo]) -> Vec<String> {
    members.iter().map(|m| m.column.clone()).collect()
}

pub fn process_primary_key(raw: &[RawConstraintInfo]) -> Option<PrimaryKey> {
    group_constraints(raw)
        .into_iter()
        .find(|members| members[0].kind == "p")
        .map(|members| PrimaryKey {
            name: members[0].name.clone(),
            columns: member_columns(&members),
        })
}

pub fn process_unique_constraints(raw: &[RawConstraintInfo]) -> Vec<UniqueConstraint> {
    group_constraints(raw)
        .into_iter()
        .filter(|members| members[0].kind == "u")
        .map(|members| UniqueConstraint {
            name: members[0].name.clone(),
            columns: member_columns(&members),
        })
        .collect()
}

pub fn process_foreign_keys(raw: &[RawConstraintInfo]) -> Vec<ForeignKey> {
    group_constraints(raw)
        .into_iter()
        .filter(|members| members[0].kind == "f")
        .filter_map(|members| {
            let ref_columns = members
                .iter()
                .map(|m| m.ref_column.clone())
                .collect::<Option<Vec<_>>>()?;
            Some(ForeignKey {
                name: members[0].name.clone(),
                columns: member_columns(&members),
                ref_table: members[0].ref_table.clone()?,
                ref_columns,
            })
        })
        .collect()
}

pub fn process_check_constraints(raw: &[RawConstraintInfo]) -> Vec<CheckConstraint> {
    group_constraints(raw)
        .into_iter()
        .filter(|members| members[0].kind == "c")
        .filter_map(|members| {
            let expression = check_predicate(members[0].definition.as_deref()?)?;
            Some(CheckConstraint {
                name: members[0].name.clone(),
                columns: member_columns(&members),
                expression,
            })
        })
        .collect()
}

pub fn process_table(
    name: &str,
    columns: &[RawColumnInfo],
    constraints: &[RawConstraintInfo],
) -> TableMetadata {
    TableMetadata {
        name: name.to_string(),
        columns: process_columns(columns),
        primary_key: process_primary_key(constraints),
        uniques: process_unique_constraints(constraints),
        foreign_keys: process_foreign_keys(constraints),
        checks: process_check_constraints(constraints),
    }
}

/// Group enum labels by enum, keeping label order.
pub fn process_enums(raw: &[RawEnumLabel]) -> BTreeMap<String, Vec<String>> {
    let mut enums: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in raw {
        enums
            .entry(row.enum_name.clone())
            .or_default()
            .push(row.label.clone());
    }
    enums
}

// =============================================================================
// Loading
// =============================================================================

pub fn table_exists<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<bool> {
    let rows = session.query(queries::TABLE_EXISTS, &[quote_ident(table).as_str()])?;
    Ok(rows.first().and_then(|r| cell(r, 0)).is_some())
}

/// Read one table's structure; `NotFound` if it does not exist.
pub fn load_table<S: Session + ?Sized>(session: &mut S, table: &str) -> Result<TableMetadata> {
    validate_identifier(table)?;
    if !table_exists(session, table)? {
        return Err(MigrationError::NotFound(format!("table \"{table}\"")));
    }
    let quoted = quote_ident(table);
    let columns: Vec<RawColumnInfo> = session
        .query(queries::COLUMNS, &[quoted.as_str()])?
        .iter()
        .filter_map(RawColumnInfo::from_row)
        .collect();
    let constraints: Vec<RawConstraintInfo> = session
        .query(queries::CONSTRAINTS, &[quoted.as_str()])?
        .iter()
        .filter_map(RawConstraintInfo::from_row)
        .collect();
    Ok(process_table(table, &columns, &constraints))
}

pub fn list_tables<S: Session + ?Sized>(session: &mut S) -> Result<Vec<String>> {
    Ok(session
        .query(queries::TABLES, &[])?
        .iter()
        .filter_map(|r| cell(r, 0))
        .collect())
}

pub fn list_enums<S: Session + ?Sized>(session: &mut S) -> Result<BTreeMap<String, Vec<String>>> {
    let labels: Vec<RawEnumLabel> = session
        .query(queries::ENUMS, &[])?
        .iter()
        .filter_map(|r| {
            Some(RawEnumLabel {
                enum_name: cell(r, 0)?,
                label: cell(r, 1)?,
            })
        })
        .collect();
    Ok(process_enums(&labels))
}

/// Ordered labels of one enum; `NotFound` if there is no such enum.
pub fn enum_values<S: Session + ?Sized>(session: &mut S, name: &str) -> Result<Vec<String>> {
    validate_identifier(name)?;
    let rows = session.query(queries::ENUM_VALUES, &[quote_ident(name).as_str()])?;
    if rows.is_empty() {
        return Err(MigrationError::NotFound(format!("enum \"{name}\"")));
    }
    Ok(rows.iter().filter_map(|r| cell(r, 0)).collect())
}

pub fn column_enum_name<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    column: &str,
) -> Result<Option<String>> {
    validate_identifier(table)?;
    validate_identifier(column)?;
    let rows = session.query(queries::COLUMN_ENUM_NAME, &[quote_ident(table).as_str(), column])?;
    Ok(rows.first().and_then(|r| cell(r, 0)))
}

// =============================================================================
// Cache
// =============================================================================

/// Table metadata cache, keyed by table name.
///
/// Single-threaded: one cache per [`Database`](crate::Database) handle.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: HashMap<String, TableMetadata>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(&self, table: &str) -> Option<&TableMetadata> {
        self.tables.get(table)
    }

    /// Cached metadata for `table`, loading it on first use.
    pub fn get<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        table: &str,
    ) -> Result<&TableMetadata> {
        if !self.tables.contains_key(table) {
            let meta = load_table(session, table)?;
            self.tables.insert(table.to_string(), meta);
        }
        self.tables
            .get(table)
            .ok_or_else(|| MigrationError::NotFound(format!("table \"{table}\"")))
    }

    pub fn invalidate(&mut self, table: &str) {
        self.tables.remove(table);
    }

    pub fn clear(&mut self) {
        self.tables.clear();
    }

    /// Invalidate `tables` (or everything with `force_clear`) and reload the
    /// named tables that still exist.
    pub fn refresh<S: Session + ?Sized>(
        &mut self,
        session: &mut S,
        tables: &[&str],
        force_clear: bool,
    ) -> Result<()> {
        if force_clear {
            self.clear();
        }
        for table in tables {
            self.invalidate(table);
        }
        for table in tables {
            if table_exists(session, table)? {
                self.get(session, table)?;
            }
        }
        Ok(())
    }
}
