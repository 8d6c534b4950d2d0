//! Record types: the unit of the wall.
//!
//! A record attributes a piece of text to a subject within a scope and a
//! release version. Records are appended by the ingestion layer and may be
//! removed by id; they are never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted wall record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
  pub id:          i64,
  pub subject_id:  i64,
  pub text:        String,
  /// When the recorded event happened. `None` for batch-imported records.
  pub occurred_at: Option<DateTime<Utc>>,
  pub scope:       String,
  pub version:     String,
}

/// Input to [`crate::store::WallStore::record`].
#[derive(Debug, Clone)]
pub struct NewRecord {
  pub subject_id:  i64,
  pub text:        String,
  pub occurred_at: Option<DateTime<Utc>>,
  /// Must match the scope of the referenced subject.
  pub scope:       String,
  pub version:     String,
}

impl NewRecord {
  /// Convenience constructor for a record without a timestamp.
  pub fn new(
    subject_id: i64,
    scope: impl Into<String>,
    version: impl Into<String>,
    text: impl Into<String>,
  ) -> Self {
    Self {
      subject_id,
      text: text.into(),
      occurred_at: None,
      scope: scope.into(),
      version: version.into(),
    }
  }

  pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
    self.occurred_at = Some(at);
    self
  }
}

/// A record joined with its subject's name, as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
  pub id:           i64,
  pub subject_name: String,
  pub text:         String,
  pub occurred_at:  Option<DateTime<Utc>>,
  pub version:      String,
}
