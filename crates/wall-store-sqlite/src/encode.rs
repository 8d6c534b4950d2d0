//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings. Booleans are stored as
//! integers, which rusqlite converts natively.

use chrono::{DateTime, Utc};
use wall_core::{
  record::RecordView,
  subject::Subject,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns `id, name, scope, is_tracking` of a `subjects` row.
pub fn subject_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subject> {
  Ok(Subject {
    id:          row.get(0)?,
    name:        row.get(1)?,
    scope:       row.get(2)?,
    is_tracking: row.get(3)?,
  })
}

/// Raw values of a `records` row joined with its subject's name.
pub struct RawRecordView {
  pub id:           i64,
  pub subject_name: String,
  pub text:         String,
  pub occurred_at:  Option<String>,
  pub version:      String,
}

impl RawRecordView {
  pub fn into_view(self) -> Result<RecordView> {
    Ok(RecordView {
      id:           self.id,
      subject_name: self.subject_name,
      text:         self.text,
      occurred_at:  decode_opt_dt(self.occurred_at)?,
      version:      self.version,
    })
  }
}
