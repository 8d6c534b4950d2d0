//! Error types for `wall-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(i64),

  #[error("subject {subject_id} belongs to scope {found:?}, not {expected:?}")]
  ScopeMismatch {
    subject_id: i64,
    expected:   String,
    found:      String,
  },

  #[error("invalid version identifier: {0:?}")]
  InvalidVersion(String),
}

/// Implemented by backend errors so callers can tell a broken domain rule
/// apart from a storage failure.
pub trait DomainError {
  /// The domain rule that was violated, if that is what this error is.
  fn domain(&self) -> Option<&Error>;
}

impl DomainError for Error {
  fn domain(&self) -> Option<&Error> { Some(self) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
