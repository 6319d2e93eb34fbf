//! Enum lifecycle: create, drop, compatibility checks and the shadow-column
//! swap of an existing column onto an enum type.

use crate::catalog::{self, ColumnInfo};
use crate::ddl::{ColumnDef, Ddl};
use crate::error::{MigrationError, Result};
use crate::executor::transaction;
use crate::normalize::{literal_text, quote_ident, quote_literal, validate_identifier};
use crate::session::Session;
use std::collections::HashSet;

/// Result of a successful [`swap_column_to_enum`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumSwap {
    /// Distinct values that were rewritten to the substitute
    pub replaced: Vec<String>,
    pub statements: Vec<String>,
}

pub fn create_enum<S: Session + ?Sized>(session: &mut S, name: &str, labels: &[String]) -> Result<()> {
    validate_identifier(name)?;
    if labels.is_empty() {
        return Err(MigrationError::invalid(format!(
            "enum \"{name}\" needs at least one value"
        )));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if label.trim().is_empty() {
            return Err(MigrationError::invalid(format!(
                "enum \"{name}\" has a blank value"
            )));
        }
        if !seen.insert(label.as_str()) {
            return Err(MigrationError::invalid(format!(
                "enum \"{name}\" repeats value {label:?}"
            )));
        }
    }
    let ddl = Ddl::CreateEnum {
        name: name.to_string(),
        labels: labels.to_vec(),
    };
    session.batch(&ddl.to_sql())
}

/// Drop an enum. Columns still using it make this fail unless `cascade`.
pub fn drop_enum<S: Session + ?Sized>(session: &mut S, name: &str, cascade: bool) -> Result<()> {
    validate_identifier(name)?;
    session.batch(&Ddl::DropEnum {
        name: name.to_string(),
        cascade,
    }
    .to_sql())
}

fn distinct_values<S: Session + ?Sized>(session: &mut S, table: &str, column: &str) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT DISTINCT {col}::text FROM {table} WHERE {col} IS NOT NULL ORDER BY 1",
        col = quote_ident(column),
        table = quote_ident(table)
    );
    Ok(session
        .query(&sql, &[])?
        .into_iter()
        .filter_map(|row| row.into_iter().next().flatten())
        .collect())
}

fn find_column<S: Session + ?Sized>(session: &mut S, table: &str, column: &str) -> Result<ColumnInfo> {
    validate_identifier(column)?;
    let meta = catalog::load_table(session, table)?;
    meta.column(column)
        .cloned()
        .ok_or_else(|| MigrationError::NotFound(format!("column \"{column}\" of table \"{table}\"")))
}

/// Distinct values of `table.column` that are not labels of `enum_name`.
pub fn find_incompatible_values<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    column: &str,
    enum_name: &str,
) -> Result<Vec<String>> {
    let labels = catalog::enum_values(session, enum_name)?;
    find_column(session, table, column)?;
    Ok(distinct_values(session, table, column)?
        .into_iter()
        .filter(|v| !labels.contains(v))
        .collect())
}

/// Retype `table.column` to `enum_name` through two shadow columns, keeping
/// the column's nullability and default.
///
/// Values outside the enum are rewritten to `substitute`, which must itself be
/// a label. Without a substitute they make the swap fail with
/// `IncompatibleValues`. Everything runs in one transaction.
pub fn swap_column_to_enum<S: Session + ?Sized>(
    session: &mut S,
    table: &str,
    column: &str,
    enum_name: &str,
    substitute: Option<&str>,
) -> Result<EnumSwap> {
    validate_identifier(table)?;
    validate_identifier(column)?;
    let labels = catalog::enum_values(session, enum_name)?;
    let source = find_column(session, table, column)?;

    let text_shadow = format!("{column}__text");
    let enum_shadow = format!("{column}__enum");
    for shadow in [&text_shadow, &enum_shadow] {
        validate_identifier(shadow)?;
    }

    transaction(session, table, |s| {
        let mut swap = EnumSwap::default();
        let mut run = |s: &mut S, ddl: Ddl| -> Result<()> {
            let sql = ddl.to_sql();
            s.batch(&sql)?;
            swap.statements.push(sql);
            Ok(())
        };

        run(s, add_shadow(table, &text_shadow, "TEXT"))?;
        s.execute(
            &format!(
                "UPDATE {t} SET {shadow} = {col}::text WHERE {col} IS NOT NULL",
                t = quote_ident(table),
                shadow = quote_ident(&text_shadow),
                col = quote_ident(column)
            ),
            &[],
        )?;

        let incompatible: Vec<String> = distinct_values(s, table, &text_shadow)?
            .into_iter()
            .filter(|v| !labels.contains(v))
            .collect();

        if !incompatible.is_empty() {
            let substitute = match substitute {
                None => {
                    return Err(MigrationError::IncompatibleValues {
                        enum_name: enum_name.to_string(),
                        values: incompatible,
                    });
                }
                Some(sub) if !labels.iter().any(|l| l == sub) => {
                    return Err(MigrationError::invalid(format!(
                        "substitute {sub:?} is not a value of enum \"{enum_name}\""
                    )));
                }
                Some(sub) => sub,
            };
            let update = format!(
                "UPDATE {t} SET {shadow} = $1 WHERE {shadow} = $2",
                t = quote_ident(table),
                shadow = quote_ident(&text_shadow)
            );
            for value in &incompatible {
                s.execute(&update, &[substitute, value.as_str()])?;
            }
        }

        run(s, add_shadow(table, &enum_shadow, &quote_ident(enum_name)))?;
        s.execute(
            &format!(
                "UPDATE {t} SET {target} = {shadow}::{ty}",
                t = quote_ident(table),
                target = quote_ident(&enum_shadow),
                shadow = quote_ident(&text_shadow),
                ty = quote_ident(enum_name)
            ),
            &[],
        )?;

        if source.not_null {
            let probe = format!(
                "SELECT 1 FROM {} WHERE {} IS NULL LIMIT 1",
                quote_ident(table),
                quote_ident(&enum_shadow)
            );
            if s.exists(&probe, &[])? {
                return Err(MigrationError::IncompatibleValues {
                    enum_name: enum_name.to_string(),
                    values: vec!["NULL".to_string()],
                });
            }
        }

        run(
            s,
            Ddl::DropColumn {
                table: table.to_string(),
                column: column.to_string(),
                cascade: true,
            },
        )?;
        run(
            s,
            Ddl::RenameColumn {
                table: table.to_string(),
                from: enum_shadow.clone(),
                to: column.to_string(),
            },
        )?;
        run(
            s,
            Ddl::DropColumn {
                table: table.to_string(),
                column: text_shadow.clone(),
                cascade: false,
            },
        )?;

        if let Some(default) = source.default.as_deref() {
            match recast_default(default, enum_name, &labels, substitute) {
                Some(default) => run(
                    s,
                    Ddl::SetDefault {
                        table: table.to_string(),
                        column: column.to_string(),
                        default,
                    },
                )?,
                None => {
                    crate::tabula_warn!(
                        "default dropped during enum swap",
                        column = %column,
                        default = %default
                    );
                }
            }
        }
        if source.not_null {
            run(
                s,
                Ddl::SetNotNull {
                    table: table.to_string(),
                    column: column.to_string(),
                },
            )?;
        }

        swap.replaced = incompatible;
        Ok(swap)
    })
}

fn add_shadow(table: &str, name: &str, sql_type: &str) -> Ddl {
    Ddl::AddColumn {
        table: table.to_string(),
        column: ColumnDef {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            default: None,
            not_null: false,
            check: None,
            references: None,
        },
    }
}

/// The column default re-expressed in the enum type, if it can be.
fn recast_default(
    default: &str,
    enum_name: &str,
    labels: &[String],
    substitute: Option<&str>,
) -> Option<String> {
    let ty = quote_ident(enum_name);
    if default.trim().eq_ignore_ascii_case("null") {
        return None;
    }
    match literal_text(default) {
        Some(text) if labels.contains(&text) => Some(format!("{}::{ty}", quote_literal(&text))),
        Some(_) => substitute.map(|sub| format!("{}::{ty}", quote_literal(sub))),
        None => Some(format!("({})::text::{ty}", default.trim())),
    }
}
