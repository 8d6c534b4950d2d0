//! The `WallStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `wall-store-sqlite`).
//! Higher layers (`wall-api`, `wall-server`) depend on this abstraction, not
//! on any concrete backend.

use std::{convert::Infallible, fmt, future::Future, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  DomainError,
  record::{NewRecord, Record, RecordView},
  schema::SchemaState,
  stats::{GroupCount, VersionStats},
  subject::Subject,
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Restricts a query to one release version, or spans all of them.
///
/// Parsed from user input: the exact literal `all` selects
/// [`VersionFilter::All`]; anything else, including `ALL`, is taken as a
/// version string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionFilter {
  #[default]
  All,
  Only(String),
}

impl VersionFilter {
  /// The version to filter on, if any.
  pub fn as_version(&self) -> Option<&str> {
    match self {
      Self::All => None,
      Self::Only(v) => Some(v),
    }
  }
}

impl FromStr for VersionFilter {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self::from(s.to_owned())) }
}

impl From<String> for VersionFilter {
  fn from(s: String) -> Self {
    if s == "all" { Self::All } else { Self::Only(s) }
  }
}

impl From<VersionFilter> for String {
  fn from(f: VersionFilter) -> Self { f.to_string() }
}

impl fmt::Display for VersionFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::All => f.write_str("all"),
      Self::Only(v) => f.write_str(v),
    }
  }
}

/// Parameters for [`WallStore::list_records`].
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
  pub scope:        String,
  pub version:      VersionFilter,
  /// Restrict to records attributed to the subject with this name.
  pub subject_name: Option<String>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Wall store backend.
///
/// [`ensure_schema`](WallStore::ensure_schema) must reach a terminal success
/// state before any other method is used; backends reject earlier access.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait WallStore: Send + Sync {
  type Error: std::error::Error + DomainError + Send + Sync + 'static;

  // ── Schema ────────────────────────────────────────────────────────────

  /// Bootstrap a fresh schema or walk the migration chain to the latest
  /// version. Safe to call on every startup.
  fn ensure_schema(
    &self,
  ) -> impl Future<Output = Result<SchemaState, Self::Error>> + Send + '_;

  /// Drop all subjects and records and re-initialise the schema from
  /// scratch.
  fn reset(&self) -> impl Future<Output = Result<SchemaState, Self::Error>> + Send + '_;

  // ── Subjects ──────────────────────────────────────────────────────────

  /// Return the subject named `name` in `scope`, creating it if it does not
  /// exist yet. Never produces duplicates.
  fn upsert_subject<'a>(
    &'a self,
    name: &'a str,
    scope: &'a str,
  ) -> impl Future<Output = Result<Subject, Self::Error>> + Send + 'a;

  /// Retrieve a subject by id. Returns `None` if not found.
  fn get_subject(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Subject>, Self::Error>> + Send + '_;

  // ── Records ───────────────────────────────────────────────────────────

  /// Persist a new record. Fails if the subject does not exist or lives in
  /// a different scope.
  fn record(
    &self,
    input: NewRecord,
  ) -> impl Future<Output = Result<Record, Self::Error>> + Send + '_;

  /// Delete a record by id. Returns `false` if no record matched.
  fn remove_record(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// List records joined with their subject names, oldest first.
  fn list_records<'a>(
    &'a self,
    query: &'a RecordQuery,
  ) -> impl Future<Output = Result<Vec<RecordView>, Self::Error>> + Send + 'a;

  // ── Aggregation ───────────────────────────────────────────────────────

  /// Count records per `(subject name, version)` within `scope`, highest
  /// count first.
  fn group_counts<'a>(
    &'a self,
    scope: &'a str,
    version: &'a VersionFilter,
  ) -> impl Future<Output = Result<Vec<GroupCount>, Self::Error>> + Send + 'a;

  /// Per-version top-N-plus-Others breakdown for `scope`. An empty `Vec`
  /// means nothing matched.
  fn compute_top_stats<'a>(
    &'a self,
    scope: &'a str,
    version: &'a VersionFilter,
  ) -> impl Future<Output = Result<Vec<VersionStats>, Self::Error>> + Send + 'a;
}
