//! Error type for `wall-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A domain rule was violated, e.g. a record referencing a missing subject.
  #[error(transparent)]
  Core(#[from] wall_core::Error),

  /// Any failure of the underlying connection; propagated unchanged.
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The stored schema version has no entry in the migration table. Fatal:
  /// the store cannot be brought to a known-good shape.
  #[error("schema drift: stored version {found:?} is not in the migration table")]
  SchemaDrift { found: String },

  /// A migration step does not move the version forward.
  #[error("migration step {from} -> {to} does not increase the schema version")]
  BackwardStep { from: String, to: String },

  /// A data operation was attempted before `ensure_schema` succeeded.
  #[error("schema not initialised; call ensure_schema first")]
  SchemaNotReady,
}

impl wall_core::DomainError for Error {
  fn domain(&self) -> Option<&wall_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
