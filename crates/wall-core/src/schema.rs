//! Schema versions and the outcome of schema initialisation.

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A parsed `MAJOR_MINOR_PATCH` schema version identifier, e.g. `1_2_0`.
///
/// Stored on disk as an underscore-separated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
  pub major: u32,
  pub minor: u32,
  pub patch: u32,
}

impl FromStr for SchemaVersion {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidVersion(s.to_owned());
    let mut parts = s.split('_').map(|p| p.parse::<u32>().map_err(|_| invalid()));

    let major = parts.next().ok_or_else(invalid)??;
    let minor = parts.next().ok_or_else(invalid)??;
    let patch = parts.next().ok_or_else(invalid)??;
    if parts.next().is_some() {
      return Err(invalid());
    }

    Ok(Self { major, minor, patch })
  }
}

impl fmt::Display for SchemaVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}_{}_{}", self.major, self.minor, self.patch)
  }
}

impl PartialOrd for SchemaVersion {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for SchemaVersion {
  fn cmp(&self, other: &Self) -> Ordering {
    (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
  }
}

/// Terminal success state of [`crate::store::WallStore::ensure_schema`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SchemaState {
  /// First run: the latest structure was declared from scratch.
  Initialized { version: String },
  /// The stored version was already the latest; nothing changed.
  Current { version: String },
  /// The migration chain ran `steps` transitions from `from` to `to`.
  Migrated {
    from:  String,
    to:    String,
    steps: usize,
  },
}

impl SchemaState {
  /// The schema version the store is at after initialisation.
  pub fn version(&self) -> &str {
    match self {
      Self::Initialized { version } | Self::Current { version } => version,
      Self::Migrated { to, .. } => to,
    }
  }
}
