use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Aggregated per-field validation violations, ordered by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(BTreeMap<&'static str, Vec<String>>);

impl Violations {
    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed for {model}: {violations}")]
    Validation {
        model: &'static str,
        violations: Violations,
    },

    /// The database, its roles, or the vault entries backing them are not
    /// provisioned yet. Never retried; the caller is expected to run setup.
    #[error("required resources are not provisioned, run setup first: {0}")]
    SetupRequired(String),

    #[error("unknown database role '{0}'")]
    UnknownRole(String),

    #[error("empty {0} supplied for a credential")]
    EmptyCredential(&'static str),

    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    /// A persisted row no longer passes the model schema it was written under.
    #[error("corrupt row in '{table}': {violations}")]
    DataCorruption {
        table: &'static str,
        violations: Violations,
    },

    #[error("job source unusable: {0}")]
    InvalidSource(String),

    #[error("database role '{0}' already exists")]
    RoleExists(String),

    /// An identifier (schema, table, or role name) failed the allow-list.
    /// Identifiers are never string-concatenated into SQL without this gate.
    #[error("'{0}' is not an allowed SQL identifier")]
    InvalidIdentifier(String),

    #[error("secret vault failure: {0}")]
    Vault(String),

    #[error("database error")]
    Db(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
