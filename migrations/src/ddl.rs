//! DDL statement builder
//!
//! Every variant carries already-validated identifiers and already-formatted
//! literals; [`Ddl::to_sql`] only quotes and concatenates.

use crate::normalize::{quote_ident, quote_literal, unqualified};

/// Inline column definition used by `ADD COLUMN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub default: Option<String>,
    pub not_null: bool,
    /// `(constraint name, predicate)`
    pub check: Option<(String, String)>,
    pub references: Option<Reference>,
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub name: String,
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ddl {
    RenameTable {
        table: String,
        to: String,
    },
    TruncateCascade {
        table: String,
    },
    AddColumn {
        table: String,
        column: ColumnDef,
    },
    DropColumn {
        table: String,
        column: String,
        cascade: bool,
    },
    RenameColumn {
        table: String,
        from: String,
        to: String,
    },
    AlterType {
        table: String,
        column: String,
        sql_type: String,
        using: Option<String>,
    },
    SetNotNull {
        table: String,
        column: String,
    },
    DropNotNull {
        table: String,
        column: String,
    },
    SetDefault {
        table: String,
        column: String,
        default: String,
    },
    DropDefault {
        table: String,
        column: String,
    },
    AddCheck {
        table: String,
        name: String,
        predicate: String,
    },
    AddForeignKey {
        table: String,
        column: String,
        references: Reference,
    },
    AddUnique {
        table: String,
        name: String,
        column: String,
    },
    AddPrimaryKey {
        table: String,
        name: String,
        column: String,
    },
    DropConstraint {
        table: String,
        name: String,
        if_exists: bool,
    },
    CreateEnum {
        name: String,
        labels: Vec<String>,
    },
    DropEnum {
        name: String,
        cascade: bool,
    },
}

impl Ddl {
    pub fn to_sql(&self) -> String {
        match self {
            Ddl::RenameTable { table, to } => format!(
                "ALTER TABLE {} RENAME TO {}",
                quote_ident(table),
                quote_ident(unqualified(to))
            ),
            Ddl::TruncateCascade { table } => format!("TRUNCATE TABLE {} CASCADE", quote_ident(table)),
            Ddl::AddColumn { table, column } => format!(
                "ALTER TABLE {} ADD COLUMN {}",
                quote_ident(table),
                column_def(column)
            ),
            Ddl::DropColumn {
                table,
                column,
                cascade,
            } => format!(
                "ALTER TABLE {} DROP COLUMN {}{}",
                quote_ident(table),
                quote_ident(column),
                if *cascade { " CASCADE" } else { "" }
            ),
            Ddl::RenameColumn { table, from, to } => format!(
                "ALTER TABLE {} RENAME COLUMN {} TO {}",
                quote_ident(table),
                quote_ident(from),
                quote_ident(to)
            ),
            Ddl::AlterType {
                table,
                column,
                sql_type,
                using,
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                    quote_ident(table),
                    quote_ident(column),
                    sql_type
                );
                if let Some(using) = using {
                    sql.push_str(" USING ");
                    sql.push_str(using);
                }
                sql
            }
            Ddl::SetNotNull { table, column } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
                quote_ident(table),
                quote_ident(column)
            ),
            Ddl::DropNotNull { table, column } => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
                quote_ident(table),
                quote_ident(column)
            ),
            Ddl::SetDefault {
                table,
                column,
                default,
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                quote_ident(table),
                quote_ident(column),
                default
            ),
            Ddl::DropDefault { table, column } => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                quote_ident(table),
                quote_ident(column)
            ),
            Ddl::AddCheck {
                table,
                name,
                predicate,
            } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} CHECK ({})",
                quote_ident(table),
                quote_ident(name),
                predicate
            ),
            Ddl::AddForeignKey {
                table,
                column,
                references,
            } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                quote_ident(table),
                quote_ident(&references.name),
                quote_ident(column),
                quote_ident(&references.table),
                quote_ident(&references.column)
            ),
            Ddl::AddUnique {
                table,
                name,
                column,
            } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                quote_ident(table),
                quote_ident(name),
                quote_ident(column)
            ),
            Ddl::AddPrimaryKey {
                table,
                name,
                column,
            } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} PRIMARY KEY ({})",
                quote_ident(table),
                quote_ident(name),
                quote_ident(column)
            ),
            Ddl::DropConstraint {
                table,
                name,
                if_exists,
            } => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}{}",
                quote_ident(table),
                if *if_exists { "IF EXISTS " } else { "" },
                quote_ident(name)
            ),
            Ddl::CreateEnum { name, labels } => {
                let labels = labels
                    .iter()
                    .map(|l| quote_literal(l))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("CREATE TYPE {} AS ENUM ({})", quote_ident(name), labels)
            }
            Ddl::DropEnum { name, cascade } => format!(
                "DROP TYPE {}{}",
                quote_ident(name),
                if *cascade { " CASCADE" } else { "" }
            ),
        }
    }
}

fn column_def(col: &ColumnDef) -> String {
    let mut sql = format!("{} {}", quote_ident(&col.name), col.sql_type);
    if let Some(default) = &col.default {
        sql.push_str(&format!(" DEFAULT {default}"));
    }
    if col.not_null {
        sql.push_str(" NOT NULL");
    }
    if let Some((name, predicate)) = &col.check {
        sql.push_str(&format!(
            " CONSTRAINT {} CHECK ({})",
            quote_ident(name),
            predicate
        ));
    }
    if let Some(fk) = &col.references {
        sql.push_str(&format!(
            " CONSTRAINT {} REFERENCES {} ({})",
            quote_ident(&fk.name),
            quote_ident(&fk.table),
            quote_ident(&fk.column)
        ));
    }
    sql
}
