//! Top-N-plus-remainder bucketing over grouped record counts.
//!
//! The store produces one [`GroupCount`] per `(subject name, version)` pair.
//! [`bucket_top_stats`] partitions those groups by version, keeps the
//! highest-ranked [`TOP_N`] per version and folds the rest into a single
//! "Others" total.

use serde::{Deserialize, Serialize};

/// How many ranked entries each version bucket keeps before folding the
/// remainder into "Others".
pub const TOP_N: usize = 4;

/// Label used for the synthetic remainder entry.
pub const OTHERS_NAME: &str = "Others";

/// Number of records attributed to `name` in `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
  pub name:    String,
  pub version: String,
  pub count:   u64,
}

impl GroupCount {
  pub fn new(name: impl Into<String>, version: impl Into<String>, count: u64) -> Self {
    Self { name: name.into(), version: version.into(), count }
  }
}

/// One slice of a per-version breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEntry {
  pub name:  String,
  /// Display label combining the name and the version, e.g. `March (v4.5)`.
  pub label: String,
  pub count: u64,
}

impl StatEntry {
  fn for_version(name: &str, version: &str, count: u64) -> Self {
    Self {
      name: name.to_owned(),
      label: format!("{name} (v{version})"),
      count,
    }
  }
}

/// The ranked breakdown for a single version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionStats {
  pub version:      String,
  /// Dataset label, e.g. `Version 4.5`.
  pub label:        String,
  /// At most [`TOP_N`] entries, highest count first.
  pub entries:      Vec<StatEntry>,
  /// Sum of every group ranked below the kept entries; zero when none.
  pub others_count: u64,
}

impl VersionStats {
  /// The synthetic remainder entry, present only when something was folded.
  pub fn others(&self) -> Option<StatEntry> {
    (self.others_count > 0)
      .then(|| StatEntry::for_version(OTHERS_NAME, &self.version, self.others_count))
  }

  /// Ranked entries followed by the "Others" entry, if any. This is the
  /// shape a chart dataset consumes.
  pub fn series(&self) -> Vec<StatEntry> {
    let mut series = self.entries.clone();
    series.extend(self.others());
    series
  }

  /// Total records across the whole bucket.
  pub fn total(&self) -> u64 {
    self.entries.iter().map(|e| e.count).sum::<u64>() + self.others_count
  }
}

/// Partition `groups` by version and bucket each partition into its top
/// `top_n` entries plus a remainder.
///
/// Buckets are emitted in order of each version's first appearance in
/// `groups`. Within a bucket the sort is stable, so groups with equal counts
/// keep their input order.
pub fn bucket_top_stats(groups: Vec<GroupCount>, top_n: usize) -> Vec<VersionStats> {
  let mut partitions: Vec<(String, Vec<GroupCount>)> = Vec::new();

  for group in groups {
    match partitions.iter_mut().find(|(v, _)| *v == group.version) {
      Some((_, members)) => members.push(group),
      None => partitions.push((group.version.clone(), vec![group])),
    }
  }

  partitions
    .into_iter()
    .map(|(version, mut members)| {
      members.sort_by(|a, b| b.count.cmp(&a.count));

      let rest = members.split_off(members.len().min(top_n));
      let others_count = rest.iter().map(|g| g.count).sum();

      let entries = members
        .iter()
        .map(|g| StatEntry::for_version(&g.name, &version, g.count))
        .collect();

      VersionStats {
        label: format!("Version {version}"),
        version,
        entries,
        others_count,
      }
    })
    .collect()
}
