// ⚠️ Error taxonomy
// Validation failures abort an import; I/O failures surface to the caller;
// logic errors are internal invariant violations.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or incomplete input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Unable to parse date: {0}")]
    InvalidDate(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: ValidationError,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid config {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown transaction id: {0}")]
    UnknownId(String),

    #[error("Transaction {0} is not categorised as Pot")]
    NotAPot(String),

    #[error("Transaction {0} cannot be linked to itself")]
    SelfLink(String),

    #[error("Logic error: {0}")]
    Logic(String),
}

impl LedgerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the error came from malformed input rather than the filesystem.
    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_) | LedgerError::Row { .. })
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
