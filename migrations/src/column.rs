//! Column-set model shared by the catalog, the planner and editors
//!
//! A [`ColumnSet`] maps caller-assigned column ids to [`ColumnSpec`]s. Ids, not
//! names, carry column identity across the old and new snapshots, which is what
//! lets the planner tell a rename from a drop + create.

use crate::error::{MigrationError, Result};
use crate::normalize::{
    canonical_default, check_predicate, format_default_text, normalize_check, quote_ident,
    unqualified, validate_identifier, validate_type_name,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Caller-assigned stable column key.
pub type ColumnId = i64;

/// Desired or observed columns of one table, keyed by column id.
pub type ColumnSet = BTreeMap<ColumnId, ColumnSpec>;

/// Coarse column type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Integer,
    Text,
    Real,
    Date,
    Boolean,
    Array,
    Enum,
    /// Any other PostgreSQL type, kept verbatim (`bigint`, `timestamp with time zone`, ...)
    Raw(String),
}

impl ColumnType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Integer => "INTEGER",
            Self::Text => "TEXT",
            Self::Real => "REAL",
            Self::Date => "DATE",
            Self::Boolean => "BOOLEAN",
            Self::Array => "ARRAY",
            Self::Enum => "ENUM",
            Self::Raw(raw) => raw,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array)
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "INTEGER" | "INT" | "INT4" => Self::Integer,
            "TEXT" => Self::Text,
            "REAL" | "FLOAT4" => Self::Real,
            "DATE" => Self::Date,
            "BOOLEAN" | "BOOL" => Self::Boolean,
            "ARRAY" => Self::Array,
            "ENUM" => Self::Enum,
            _ => Self::Raw(value.trim().to_string()),
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column's desired or observed structure.
///
/// Deserializes from the editor JSON shape: blank strings and a zero `length`
/// read as absent, and `default` accepts any JSON scalar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub enum_name: Option<String>,
    #[serde(default, deserialize_with = "zero_as_none")]
    pub length: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub array_elem_type: Option<String>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default, deserialize_with = "scalar_as_text")]
    pub default: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub check: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fk_table: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub fk_column: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            enum_name: None,
            length: None,
            array_elem_type: None,
            not_null: false,
            unique: false,
            primary_key: false,
            default: None,
            check: None,
            fk_table: None,
            fk_column: None,
        }
    }

    pub fn text(name: impl Into<String>, length: Option<u32>) -> Self {
        Self {
            length,
            ..Self::new(name, ColumnType::Text)
        }
    }

    pub fn array(name: impl Into<String>, elem_type: impl Into<String>) -> Self {
        Self {
            array_elem_type: Some(elem_type.into()),
            ..Self::new(name, ColumnType::Array)
        }
    }

    pub fn enumeration(name: impl Into<String>, enum_name: impl Into<String>) -> Self {
        Self {
            enum_name: Some(enum_name.into()),
            ..Self::new(name, ColumnType::Enum)
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn default_value(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn check(mut self, check: impl Into<String>) -> Self {
        self.check = Some(check.into());
        self
    }

    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.fk_table = Some(table.into());
        self.fk_column = Some(column.into());
        self
    }

    /// `NOT NULL` as enforced: a primary key column is always not null.
    pub fn effective_not_null(&self) -> bool {
        self.not_null || self.primary_key
    }

    /// Whether a separate unique constraint is wanted. A primary key already
    /// guarantees uniqueness, so it never gets its own.
    pub fn effective_unique(&self) -> bool {
        self.unique && !self.primary_key
    }

    pub fn canonical_default(&self) -> Option<String> {
        canonical_default(self.default.as_deref())
    }

    /// Default as DDL text. `NULL` counts as no default.
    pub fn default_sql(&self) -> Option<String> {
        self.default
            .as_deref()
            .and_then(format_default_text)
            .filter(|d| d != "NULL")
    }

    pub fn canonical_check(&self) -> Option<String> {
        self.check.as_deref().and_then(normalize_check)
    }

    /// Check predicate as DDL text, spacing kept as written.
    pub fn check_sql(&self) -> Option<String> {
        self.check.as_deref().and_then(check_predicate)
    }

    /// `(table, column)` of the referenced column, if any.
    pub fn foreign_key(&self) -> Option<(&str, &str)> {
        match (self.fk_table.as_deref(), self.fk_column.as_deref()) {
            (Some(t), Some(c)) => Some((t, c)),
            _ => None,
        }
    }

    /// Whether a type change is needed to go from `self` to `new`.
    ///
    /// Raw and array element type names compare case-insensitively.
    pub fn type_differs(&self, new: &ColumnSpec) -> bool {
        match (&self.column_type, &new.column_type) {
            (ColumnType::Raw(a), ColumnType::Raw(b)) => type_key(a) != type_key(b),
            (a, b) if a != b => true,
            (_, ColumnType::Text) => self.length != new.length,
            (_, ColumnType::Array) => {
                self.array_elem_type.as_deref().map(type_key)
                    != new.array_elem_type.as_deref().map(type_key)
            }
            (_, ColumnType::Enum) => self.enum_name != new.enum_name,
            _ => false,
        }
    }

    /// SQL type text for this column (`VARCHAR(10)`, `integer[]`, `"status"`).
    pub fn sql_type(&self) -> Result<String> {
        Ok(match &self.column_type {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::Text => match self.length {
                Some(len) if len > 0 => format!("VARCHAR({len})"),
                _ => "TEXT".to_string(),
            },
            ColumnType::Real => "REAL".to_string(),
            ColumnType::Date => "DATE".to_string(),
            ColumnType::Boolean => "BOOLEAN".to_string(),
            ColumnType::Array => {
                let elem = self.array_elem_type.as_deref().ok_or_else(|| {
                    MigrationError::invalid(format!(
                        "column {:?} is ARRAY but has no array_elem_type",
                        self.name
                    ))
                })?;
                format!("{}[]", validate_type_name(elem)?)
            }
            ColumnType::Enum => {
                let name = self.enum_name.as_deref().ok_or_else(|| {
                    MigrationError::invalid(format!(
                        "column {:?} is ENUM but has no enum_name",
                        self.name
                    ))
                })?;
                quote_ident(validate_identifier(name)?)
            }
            ColumnType::Raw(raw) => validate_type_name(raw)?.to_string(),
        })
    }

    /// Reject specs that cannot be planned: bad identifiers, bad types, a
    /// half-specified foreign key.
    pub fn validate(&self) -> Result<()> {
        validate_identifier(&self.name)?;
        self.sql_type()?;
        if self.check.as_deref().is_some_and(|c| c.contains(';')) {
            return Err(MigrationError::invalid(format!(
                "column {:?}: check must be a single expression",
                self.name
            )));
        }
        match (&self.fk_table, &self.fk_column) {
            (Some(t), Some(c)) => {
                validate_identifier(t)?;
                validate_identifier(c)?;
            }
            (None, None) => {}
            _ => {
                return Err(MigrationError::invalid(format!(
                    "column {:?}: fk_table and fk_column must be given together",
                    self.name
                )));
            }
        }
        Ok(())
    }
}

/// `Numeric(10,  2)` and `numeric(10, 2)` share a key.
fn type_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_lowercase()
}

/// `uniq_<table>_<column>`
pub fn unique_constraint_name(table: &str, column: &str) -> String {
    format!("uniq_{}_{}", unqualified(table), column)
}

/// `chk_<table>_<column>`
pub fn check_constraint_name(table: &str, column: &str) -> String {
    format!("chk_{}_{}", unqualified(table), column)
}

/// `fk_<table>_<column>`
pub fn foreign_key_name(table: &str, column: &str) -> String {
    format!("fk_{}_{}", unqualified(table), column)
}

/// `pk_<table>`
pub fn primary_key_name(table: &str) -> String {
    format!("pk_{}", unqualified(table))
}

fn blank_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

fn zero_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<u32> = Option::deserialize(deserializer)?;
    Ok(value.filter(|len| *len > 0))
}

fn scalar_as_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s).filter(|s| !s.trim().is_empty()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_editor_shape() {
        let set: ColumnSet = serde_json::from_value(json!({
            "1": {
                "name": "age",
                "type": "INTEGER",
                "not_null": false,
                "unique": false,
                "primary_key": false,
                "default": 0,
                "check": "",
                "length": 0,
                "array_elem_type": null,
                "fk_table": "",
                "fk_column": null
            },
            "2": { "name": "tags", "type": "ARRAY", "array_elem_type": "text" },
            "3": { "name": "created", "type": "timestamp with time zone", "default": true }
        }))
        .unwrap();

        let age = &set[&1];
        assert_eq!(age.column_type, ColumnType::Integer);
        assert_eq!(age.default.as_deref(), Some("0"));
        assert_eq!(age.check, None);
        assert_eq!(age.length, None);
        assert_eq!(age.foreign_key(), None);

        assert_eq!(set[&2].sql_type().unwrap(), "text[]");
        assert_eq!(
            set[&3].column_type,
            ColumnType::Raw("timestamp with time zone".into())
        );
        assert_eq!(set[&3].default.as_deref(), Some("true"));
    }

    #[test]
    fn test_sql_type() {
        assert_eq!(
            ColumnSpec::text("name", Some(10)).sql_type().unwrap(),
            "VARCHAR(10)"
        );
        assert_eq!(ColumnSpec::text("name", None).sql_type().unwrap(), "TEXT");
        assert_eq!(
            ColumnSpec::enumeration("s", "status").sql_type().unwrap(),
            "\"status\""
        );
        assert!(ColumnSpec::new("s", ColumnType::Enum).sql_type().is_err());
        assert!(
            ColumnSpec::new("x", ColumnType::Raw("int; drop".into()))
                .sql_type()
                .is_err()
        );
    }

    #[test]
    fn test_validate_half_foreign_key() {
        let mut spec = ColumnSpec::new("owner", ColumnType::Integer);
        spec.fk_table = Some("users".into());
        assert_eq!(
            spec.validate().unwrap_err().kind(),
            crate::ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_validate_rejects_stacked_check() {
        let spec = ColumnSpec::new("age", ColumnType::Integer).check("age > 0); DROP TABLE t; --");
        assert_eq!(
            spec.validate().unwrap_err().kind(),
            crate::ErrorKind::InvalidArgument
        );
        assert!(
            ColumnSpec::new("age", ColumnType::Integer)
                .check("age > 0")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_effective_flags() {
        let pk = ColumnSpec::new("id", ColumnType::Integer).unique().primary_key();
        assert!(pk.effective_not_null());
        assert!(!pk.effective_unique());
    }

    #[test]
    fn test_type_names_compare_case_insensitively() {
        let raw = |ty: &str| ColumnSpec::new("x", ColumnType::Raw(ty.into()));
        assert!(!raw("bigint").type_differs(&raw("BIGINT")));
        assert!(!raw("numeric(10,2)").type_differs(&raw("NUMERIC(10,2)")));
        assert!(raw("bigint").type_differs(&raw("smallint")));

        let tags = ColumnSpec::array("tags", "integer");
        assert!(!tags.type_differs(&ColumnSpec::array("tags", "INTEGER")));
        assert!(tags.type_differs(&ColumnSpec::array("tags", "text")));
    }

    #[test]
    fn test_null_default_is_no_default() {
        let n = ColumnSpec::new("n", ColumnType::Integer);
        assert_eq!(n.clone().default_value("NULL").default_sql(), None);
        assert_eq!(n.clone().default_value("null").default_sql(), None);
        assert_eq!(n.default_value("0").default_sql(), Some("0".into()));
    }

    #[test]
    fn test_constraint_names() {
        assert_eq!(unique_constraint_name("public.users", "email"), "uniq_users_email");
        assert_eq!(check_constraint_name("users", "age"), "chk_users_age");
        assert_eq!(foreign_key_name("users", "org_id"), "fk_users_org_id");
        assert_eq!(primary_key_name("users"), "pk_users");
    }
}
