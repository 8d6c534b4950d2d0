//! The versioned migration chain.
//!
//! A store is brought from its stored schema version to [`LATEST_VERSION`] by
//! walking [`MIGRATIONS`] one step at a time. The table is the single source
//! of truth: a stored version that does not appear as a `from` is fatal
//! ([`Error::SchemaDrift`]), never silently skipped.

use rusqlite::Connection;
use wall_core::schema::SchemaVersion;

use crate::{Error, Result, schema::WRITE_VERSION};

/// The version a freshly initialised store is created at, and the terminal
/// state of every chain.
pub const LATEST_VERSION: &str = "1_2_0";

/// One transition of the chain.
#[derive(Debug)]
pub struct Migration {
  pub from:        &'static str,
  pub to:          &'static str,
  pub description: &'static str,
  /// Applied inside the transaction that also records `to`.
  pub apply:       fn(&Connection) -> rusqlite::Result<()>,
}

/// Ordered transitions; each `to` is the `from` of the next.
pub const MIGRATIONS: &[Migration] = &[
  Migration {
    from:        "1_0_0",
    to:          "1_1_0",
    description: "rename records.desription to records.text; index records",
    apply:       rename_record_text,
  },
  Migration {
    from:        "1_1_0",
    to:          "1_2_0",
    description: "merge duplicate subjects; enforce unique (name, scope)",
    apply:       unique_subjects,
  },
];

/// Resolve the ordered steps leading from `from` to [`LATEST_VERSION`].
///
/// The whole plan is resolved before anything runs, so an unknown version
/// fails without a partial write. Returns an empty plan when `from` is
/// already the latest.
pub fn plan(from: &str) -> Result<Vec<&'static Migration>> { plan_in(MIGRATIONS, from) }

fn plan_in<'t>(table: &'t [Migration], from: &str) -> Result<Vec<&'t Migration>> {
  let mut steps: Vec<&'t Migration> = Vec::new();
  let mut current = from;

  while current != LATEST_VERSION {
    // Bounded by the table length so a malformed table cannot loop forever.
    let step = table
      .iter()
      .find(|m| m.from == current)
      .filter(|_| steps.len() < table.len())
      .ok_or_else(|| Error::SchemaDrift { found: current.to_owned() })?;

    let step_from: SchemaVersion = step.from.parse()?;
    let step_to: SchemaVersion = step.to.parse()?;
    if step_to <= step_from {
      return Err(Error::BackwardStep { from: step.from.to_owned(), to: step.to.to_owned() });
    }

    steps.push(step);
    current = step.to;
  }

  Ok(steps)
}

/// Persist `version` as the stored schema version.
pub(crate) fn write_version(conn: &Connection, version: &str) -> rusqlite::Result<()> {
  conn.execute(WRITE_VERSION, rusqlite::params![version])?;
  Ok(())
}

// ─── Steps ───────────────────────────────────────────────────────────────────

fn rename_record_text(conn: &Connection) -> rusqlite::Result<()> {
  conn.execute_batch(
    "ALTER TABLE records RENAME COLUMN desription TO text;
     CREATE INDEX IF NOT EXISTS records_scope_version_idx ON records(scope, version);
     CREATE INDEX IF NOT EXISTS records_subject_idx       ON records(subject_id);",
  )
}

fn unique_subjects(conn: &Connection) -> rusqlite::Result<()> {
  // Point every record at the lowest id sharing its subject's (name, scope).
  let repointed = conn.execute(
    "UPDATE records
     SET subject_id = (
       SELECT MIN(dup.id)
       FROM subjects cur
       JOIN subjects dup ON dup.name = cur.name AND dup.scope = cur.scope
       WHERE cur.id = records.subject_id
     )
     WHERE subject_id IN (SELECT id FROM subjects)",
    [],
  )?;

  let merged = conn.execute(
    "DELETE FROM subjects
     WHERE id NOT IN (SELECT MIN(id) FROM subjects GROUP BY name, scope)",
    [],
  )?;

  if merged > 0 {
    tracing::info!(merged, repointed, "merged duplicate subjects");
  }

  conn.execute_batch(
    "CREATE UNIQUE INDEX IF NOT EXISTS subjects_name_scope_idx ON subjects(name, scope);",
  )
}
