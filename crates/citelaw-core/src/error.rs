//! The crate-wide error taxonomy.
//!
//! Every fallible operation in citelaw returns one of these five variants.
//! Pattern-match failures and context-resolution gaps are never represented
//! here — they are absences of a citation, not errors (see
//! `citelaw-detect`).

use thiserror::Error;

/// The five-member error taxonomy shared by every citelaw crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CiteError {
    /// An argument was out of range or malformed, e.g. depth > 5.
    /// Fails immediately; never retried.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested statute or article does not exist. Surfaced to the
    /// caller as-is; never retried.
    #[error("not found: {0}")]
    NotFound(String),

    /// A graph-store timeout or connection loss. Retried once after a
    /// short delay by the caller; if it still fails the batch is dropped.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Unreadable article text or a malformed law-number string. Logged
    /// and skipped; never aborts a larger run.
    #[error("data defect: {0}")]
    DataDefect(String),

    /// An unwritable checkpoint file or unreadable dictionary source at
    /// startup. Aborts the process.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CiteError {
    /// Maps this error onto the process exit-code contract: 0 success, 1
    /// unexpected failure, 2 usage, 3 requested entity not found.
    pub fn exit_code(&self) -> i32 {
        match self {
            CiteError::InvalidInput(_) => 2,
            CiteError::NotFound(_) => 3,
            CiteError::Transient(_) | CiteError::DataDefect(_) | CiteError::Fatal(_) => 1,
        }
    }

    /// Whether the orchestrator should retry this error once before
    /// dropping the batch. Only `Transient` is worth retrying; the other
    /// variants are permanent for the input that produced them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CiteError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(CiteError::InvalidInput("x".into()).exit_code(), 2);
        assert_eq!(CiteError::NotFound("x".into()).exit_code(), 3);
        assert_eq!(CiteError::Transient("x".into()).exit_code(), 1);
        assert_eq!(CiteError::DataDefect("x".into()).exit_code(), 1);
        assert_eq!(CiteError::Fatal("x".into()).exit_code(), 1);
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(CiteError::Transient("x".into()).is_retryable());
        assert!(!CiteError::DataDefect("x".into()).is_retryable());
    }
}
