//! Error types for clip store operations.

use std::fmt;

use thiserror::Error;

/// SQLite primary result codes the store reacts to.
const SQLITE_BUSY: i64 = 5;
const SQLITE_LOCKED: i64 = 6;
const SQLITE_CONSTRAINT: i64 = 19;

/// How a database failure should be handled by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// Another writer holds the database or the pool is exhausted; the same
    /// statement may succeed a moment later.
    Contention,
    /// A schema constraint rejected the statement (unknown namespace,
    /// duplicate key, bad status value).
    Constraint,
    /// Anything else.
    Other,
}

impl DbErrorKind {
    #[must_use]
    pub fn from_sqlx(error: &sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolTimedOut => Self::Contention,
            sqlx::Error::Database(db) => {
                // Extended codes carry the primary code in the low byte.
                let primary = db
                    .code()
                    .and_then(|code| code.parse::<i64>().ok())
                    .map(|code| code & 0xff);
                match primary {
                    Some(SQLITE_BUSY | SQLITE_LOCKED) => Self::Contention,
                    Some(SQLITE_CONSTRAINT) => Self::Constraint,
                    _ if db.is_unique_violation()
                        || db.is_foreign_key_violation()
                        || db.is_check_violation() =>
                    {
                        Self::Constraint
                    }
                    _ if db.message().contains("locked") => Self::Contention,
                    _ => Self::Other,
                }
            }
            _ => Self::Other,
        }
    }
}

impl fmt::Display for DbErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Contention => "contention",
            Self::Constraint => "constraint",
            Self::Other => "other",
        })
    }
}

/// Errors that can occur during clip store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error ({kind}): {message}")]
    Database {
        kind: DbErrorKind,
        message: String,
    },

    /// No clip row with this local id exists in the namespace.
    #[error("clip record not found: namespace {namespace}, local id {local_id}")]
    RecordNotFound { namespace: String, local_id: i64 },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            kind: DbErrorKind::from_sqlx(&err),
            message: err.to_string(),
        }
    }
}

impl StoreError {
    /// True when repeating the same statement shortly may succeed.
    #[must_use]
    pub fn is_contention(&self) -> bool {
        matches!(
            self,
            Self::Database {
                kind: DbErrorKind::Contention,
                ..
            }
        )
    }
}
