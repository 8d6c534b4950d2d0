//! Subject: the named entity a wall record is attributed to.

use serde::{Deserialize, Serialize};

/// A named entity within a scope. `(name, scope)` is unique; subjects are
/// created lazily on first reference and never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
  pub id:          i64,
  pub name:        String,
  /// Community or channel identifier the subject lives in.
  pub scope:       String,
  pub is_tracking: bool,
}
