//! Configuration for the Tabula CLI
//!
//! Handles loading `tabula.toml` with typed credentials.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tabula_migrations::{MigrationOptions, RetryPolicy};

pub const CONFIG_FILE: &str = "tabula.toml";

/// Environment variable consulted when the config has no credentials.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Userinfo characters that must be escaped inside a connection URL.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ============================================================================
// Credentials
// ============================================================================

/// PostgreSQL credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Url(Box<str>),
    Host {
        host: Box<str>,
        port: u16,
        user: Option<Box<str>>,
        password: Option<Box<str>>,
        database: Box<str>,
    },
}

impl Credentials {
    /// Build connection URL, percent-encoding the user and password.
    pub fn connection_url(&self) -> String {
        match self {
            Self::Url(url) => url.to_string(),
            Self::Host {
                host,
                port,
                user,
                password,
                database,
            } => {
                let enc = |s: &str| utf8_percent_encode(s, USERINFO).to_string();
                let auth = match (user, password) {
                    (Some(u), Some(p)) => format!("{}:{}@", enc(u), enc(p)),
                    (Some(u), None) => format!("{}@", enc(u)),
                    _ => String::new(),
                };
                format!("postgres://{auth}{host}:{port}/{database}")
            }
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    db_credentials: Option<RawCreds>,

    #[serde(default)]
    pub migration: MigrationSection,
}

/// `[migration]` table
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationSection {
    /// Empty the table and retry when the first attempt fails
    #[serde(default = "yes")]
    pub destructive_retry: bool,
}

impl Default for MigrationSection {
    fn default() -> Self {
        Self {
            destructive_retry: true,
        }
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawCreds {
    Url {
        url: String,
    },
    Host {
        host: String,
        #[serde(default)]
        port: Option<u16>,
        #[serde(default)]
        user: Option<String>,
        #[serde(default)]
        password: Option<String>,
        database: String,
    },
}

impl Config {
    /// Load from the default config file, or defaults when it does not exist.
    pub fn load() -> Result<Self, Error> {
        match Self::load_from(Path::new(CONFIG_FILE)) {
            Err(Error::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    /// Load from specific path
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(path.into())
            } else {
                Error::Io(path.into(), e)
            }
        })?;

        let config: Self =
            toml::from_str(&content).map_err(|e| Error::Parse(path.into(), Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        match &self.db_credentials {
            Some(RawCreds::Url { url }) if !url.starts_with("postgres") => Err(
                Error::InvalidCredentials("PostgreSQL URL must start with postgres://".into()),
            ),
            Some(RawCreds::Host { host, .. }) if host.trim().is_empty() => {
                Err(Error::InvalidCredentials("host must not be empty".into()))
            }
            _ => Ok(()),
        }
    }

    /// Get typed credentials
    pub fn credentials(&self) -> Option<Credentials> {
        let creds = match self.db_credentials.as_ref()? {
            RawCreds::Url { url } => Credentials::Url(url.as_str().into()),
            RawCreds::Host {
                host,
                port,
                user,
                password,
                database,
            } => Credentials::Host {
                host: host.as_str().into(),
                port: port.unwrap_or(5432),
                user: user.as_deref().map(Into::into),
                password: password.as_deref().map(Into::into),
                database: database.as_str().into(),
            },
        };
        Some(creds)
    }

    /// Connection URL from the config, falling back to `env_url`.
    pub fn database_url(&self, env_url: Option<String>) -> Result<String, Error> {
        if let Some(creds) = self.credentials() {
            return Ok(creds.connection_url());
        }
        env_url
            .filter(|url| !url.trim().is_empty())
            .ok_or(Error::MissingCredentials)
    }

    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions {
            retry: if self.migration.destructive_retry {
                RetryPolicy::TruncateAndRetry
            } else {
                RetryPolicy::FailFast
            },
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] Box<toml::de::Error>),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("no database credentials: add [dbCredentials] to tabula.toml or set DATABASE_URL")]
    MissingCredentials,
}

pub type ConfigError = Error;

// ============================================================================
// Tests
// ============================================================================
