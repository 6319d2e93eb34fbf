use thiserror::Error;

/// Coarse classification of a [`MigrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before touching the catalog
    InvalidArgument,
    /// Referenced enum, table or column is absent
    NotFound,
    /// The database (or a probe) refused the change because of existing data
    ConstraintViolation,
    /// Enum swap found values outside the target label set
    IncompatibleValues,
    /// Any other driver or catalog failure
    Database,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MigrationError {
    /// Malformed argument (empty enum label list, bad substitute, bad column spec...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Identifier that cannot be safely interpolated into DDL
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Missing table, column or enum
    #[error("Not found: {0}")]
    NotFound(String),

    /// Constraint violation, with the driver's message
    #[error("{0}")]
    ConstraintViolation(String),

    /// Values that do not fit the target enum
    #[error("Values incompatible with enum \"{enum_name}\": {}", values.join(", "))]
    IncompatibleValues {
        enum_name: String,
        values: Vec<String>,
    },

    /// Driver or catalog error, with the driver's message
    #[error("{0}")]
    Database(String),
}

impl MigrationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::InvalidIdentifier(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConstraintViolation(_) => ErrorKind::ConstraintViolation,
            Self::IncompatibleValues { .. } => ErrorKind::IncompatibleValues,
            Self::Database(_) => ErrorKind::Database,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

#[cfg(feature = "postgres-sync")]
impl From<postgres::Error> for MigrationError {
    fn from(e: postgres::Error) -> Self {
        let message = match e.as_db_error() {
            Some(db) => db.message().to_string(),
            None => e.to_string(),
        };
        match e.code() {
            Some(code) if code.code().starts_with("23") => Self::ConstraintViolation(message),
            _ => Self::Database(message),
        }
    }
}

/// Result type for migration operations
pub type Result<T> = std::result::Result<T, MigrationError>;
