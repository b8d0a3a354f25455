use thiserror::Error;

/// Failure of a single audit write. Only ever logged, never surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditStoreError {
    #[error("transient error: {0}")]
    Transient(String),

    #[error("permanent error: {0}")]
    Permanent(String),
}
