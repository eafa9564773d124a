use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Result alias for errors emitted by update-guard internals.
pub type AuditResult<T> = Result<T, AuditError>;

/// Structured error type for update-guard subsystems.
///
/// Only `MalformedGraph` is produced by the analysis itself, and only before
/// any dominance work starts: a graph that fails validation aborts the audit
/// of that one function so a batch caller can continue with the rest.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed control-flow graph: {0}")]
    MalformedGraph(String),

    #[error("{0}")]
    Other(String),
}

impl AuditError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedGraph(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Convert to anyhow::Error for interop with anyhow-based code.
    pub fn into_anyhow(self) -> AnyhowError {
        AnyhowError::new(self)
    }
}

impl From<AnyhowError> for AuditError {
    fn from(err: AnyhowError) -> Self {
        AuditError::other(err.to_string())
    }
}

/// Convenience macro mirroring `anyhow::bail!` but returning a
/// `MalformedGraph` error, the only fatal class the analysis produces.
#[macro_export]
macro_rules! graph_bail {
    ($($arg:tt)*) => {
        return Err($crate::error::AuditError::malformed(format!($($arg)*)));
    };
}

/// Convenience macro mirroring `anyhow::ensure!` for graph validation.
#[macro_export]
macro_rules! graph_ensure {
    ($cond:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::graph_bail!($($arg)*);
        }
    };
}
