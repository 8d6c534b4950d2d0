//! [`SqliteStore`]: the SQLite implementation of [`WallStore`].

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
  },
};

use rusqlite::OptionalExtension as _;
use wall_core::{
  record::{NewRecord, Record, RecordView},
  schema::SchemaState,
  stats::{GroupCount, TOP_N, VersionStats, bucket_top_stats},
  store::{RecordQuery, VersionFilter, WallStore},
  subject::Subject,
};

use crate::{
  Error, Result,
  encode::{RawRecordView, encode_dt, subject_from_row},
  migrate::{self, LATEST_VERSION},
  schema::{
    CONNECTION_PRAGMAS, COUNT_DATA_TABLES, DROP_DATA, LATEST_SCHEMA, META_SCHEMA, SELECT_VERSION,
  },
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Wall store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection and readiness flag are
/// reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
  /// Set once `ensure_schema` has reached a terminal success state.
  ready: Arc<AtomicBool>,
}

/// What the metadata table says about the store.
enum StoredVersion {
  /// No meta row, or a `NULL` version over a store with no data tables.
  Fresh,
  /// A `NULL` version sitting on top of existing data tables.
  Unstamped,
  Known(String),
}

/// Result of the subject check performed alongside a record insert.
enum InsertOutcome {
  Inserted(i64),
  MissingSubject,
  WrongScope(String),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let store = Self::connect(path).await?;
    store.ensure_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store with a fresh schema: useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self::from_connection(conn).await?;
    store.ensure_schema().await?;
    Ok(store)
  }

  /// Open a store without touching its schema. Data operations fail with
  /// [`Error::SchemaNotReady`] until [`WallStore::ensure_schema`] succeeds.
  pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::from_connection(conn).await
  }

  pub(crate) async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(())
      })
      .await?;

    Ok(Self { conn, ready: Arc::new(AtomicBool::new(false)) })
  }

  fn check_ready(&self) -> Result<()> {
    if self.ready.load(Ordering::Acquire) {
      Ok(())
    } else {
      Err(Error::SchemaNotReady)
    }
  }

  /// Read the stored schema version, declaring the metadata table first.
  async fn stored_version(&self) -> Result<StoredVersion> {
    let version = self
      .conn
      .call(|conn| {
        conn.execute_batch(META_SCHEMA)?;
        let version: Option<Option<String>> = conn
          .query_row(SELECT_VERSION, [], |row| row.get(0))
          .optional()?;

        Ok(match version {
          None => StoredVersion::Fresh,
          Some(Some(version)) => StoredVersion::Known(version),
          Some(None) => {
            let tables: i64 = conn.query_row(COUNT_DATA_TABLES, [], |row| row.get(0))?;
            if tables == 0 { StoredVersion::Fresh } else { StoredVersion::Unstamped }
          }
        })
      })
      .await?;
    Ok(version)
  }

  /// Declare the latest structure and stamp the metadata row.
  async fn bootstrap(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(LATEST_SCHEMA)?;
        migrate::write_version(&tx, LATEST_VERSION)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Walk the migration chain from `from`, committing the new version after
  /// every step so an interrupted run resumes where it stopped.
  async fn migrate_from(&self, from: &str) -> Result<usize> {
    let steps = migrate::plan(from).inspect_err(|e| {
      tracing::warn!(stored = from, latest = LATEST_VERSION, "{e}");
    })?;

    for step in &steps {
      let step = *step;
      tracing::info!("migrating schema {} -> {}: {}", step.from, step.to, step.description);

      self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          (step.apply)(&tx)?;
          migrate::write_version(&tx, step.to)?;
          tx.commit()?;
          Ok(())
        })
        .await?;
    }

    Ok(steps.len())
  }
}

// ─── WallStore impl ──────────────────────────────────────────────────────────

impl WallStore for SqliteStore {
  type Error = Error;

  // ── Schema ────────────────────────────────────────────────────────────────

  async fn ensure_schema(&self) -> Result<SchemaState> {
    let state = match self.stored_version().await? {
      StoredVersion::Fresh => {
        self.bootstrap().await?;
        tracing::info!("initialised schema at version {LATEST_VERSION}");
        SchemaState::Initialized { version: LATEST_VERSION.to_owned() }
      }
      StoredVersion::Unstamped => {
        tracing::warn!("schema version is NULL but data tables exist");
        return Err(Error::SchemaDrift { found: "NULL".to_owned() });
      }
      StoredVersion::Known(version) if version == LATEST_VERSION => {
        tracing::debug!("schema is current at version {version}");
        SchemaState::Current { version }
      }
      StoredVersion::Known(version) => {
        let steps = self.migrate_from(&version).await?;
        tracing::info!("migrated schema from {version} to {LATEST_VERSION} in {steps} step(s)");
        SchemaState::Migrated {
          from: version,
          to: LATEST_VERSION.to_owned(),
          steps,
        }
      }
    };

    self.ready.store(true, Ordering::Release);
    Ok(state)
  }

  async fn reset(&self) -> Result<SchemaState> {
    self.ready.store(false, Ordering::Release);

    self
      .conn
      .call(|conn| {
        conn.execute_batch(META_SCHEMA)?;
        let tx = conn.transaction()?;
        tx.execute_batch(DROP_DATA)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    tracing::info!("dropped subjects and records");
    self.ensure_schema().await
  }

  // ── Subjects ──────────────────────────────────────────────────────────────

  async fn upsert_subject(&self, name: &str, scope: &str) -> Result<Subject> {
    self.check_ready()?;

    let name  = name.to_owned();
    let scope = scope.to_owned();

    let subject = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (name, scope, is_tracking) VALUES (?1, ?2, 1)
           ON CONFLICT (name, scope) DO NOTHING",
          rusqlite::params![name, scope],
        )?;
        Ok(conn.query_row(
          "SELECT id, name, scope, is_tracking FROM subjects WHERE name = ?1 AND scope = ?2",
          rusqlite::params![name, scope],
          subject_from_row,
        )?)
      })
      .await?;

    Ok(subject)
  }

  async fn get_subject(&self, id: i64) -> Result<Option<Subject>> {
    self.check_ready()?;

    let subject = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT id, name, scope, is_tracking FROM subjects WHERE id = ?1",
            rusqlite::params![id],
            subject_from_row,
          )
          .optional()?)
      })
      .await?;

    Ok(subject)
  }

  // ── Records ───────────────────────────────────────────────────────────────

  async fn record(&self, input: NewRecord) -> Result<Record> {
    self.check_ready()?;

    let subject_id      = input.subject_id;
    let text            = input.text.clone();
    let occurred_at_str = input.occurred_at.map(encode_dt);
    let scope           = input.scope.clone();
    let version         = input.version.clone();

    let outcome = self
      .conn
      .call(move |conn| {
        let owner: Option<String> = conn
          .query_row(
            "SELECT scope FROM subjects WHERE id = ?1",
            rusqlite::params![subject_id],
            |r| r.get(0),
          )
          .optional()?;

        match owner {
          None => return Ok(InsertOutcome::MissingSubject),
          Some(owner) if owner != scope => return Ok(InsertOutcome::WrongScope(owner)),
          Some(_) => {}
        }

        conn.execute(
          "INSERT INTO records (subject_id, text, occurred_at, scope, version)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![subject_id, text, occurred_at_str, scope, version],
        )?;
        Ok(InsertOutcome::Inserted(conn.last_insert_rowid()))
      })
      .await?;

    match outcome {
      InsertOutcome::Inserted(id) => Ok(Record {
        id,
        subject_id:  input.subject_id,
        text:        input.text,
        occurred_at: input.occurred_at,
        scope:       input.scope,
        version:     input.version,
      }),
      InsertOutcome::MissingSubject => {
        Err(wall_core::Error::SubjectNotFound(input.subject_id).into())
      }
      InsertOutcome::WrongScope(found) => Err(
        wall_core::Error::ScopeMismatch {
          subject_id: input.subject_id,
          expected: input.scope,
          found,
        }
        .into(),
      ),
    }
  }

  async fn remove_record(&self, id: i64) -> Result<bool> {
    self.check_ready()?;

    let matched = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM records WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;

    tracing::debug!(id, matched, "removed record");
    Ok(matched > 0)
  }

  async fn list_records(&self, query: &RecordQuery) -> Result<Vec<RecordView>> {
    self.check_ready()?;

    let scope   = query.scope.clone();
    let version = query.version.as_version().map(str::to_owned);
    let name    = query.subject_name.clone();

    let raws: Vec<RawRecordView> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.id, s.name, r.text, r.occurred_at, r.version
           FROM records r
           JOIN subjects s ON s.id = r.subject_id
           WHERE r.scope = ?1
             AND (?2 IS NULL OR r.version = ?2)
             AND (?3 IS NULL OR s.name = ?3)
           ORDER BY r.id",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![scope, version, name], |row| {
            Ok(RawRecordView {
              id:           row.get(0)?,
              subject_name: row.get(1)?,
              text:         row.get(2)?,
              occurred_at:  row.get(3)?,
              version:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecordView::into_view).collect()
  }

  // ── Aggregation ───────────────────────────────────────────────────────────

  async fn group_counts(
    &self,
    scope:   &str,
    version: &VersionFilter,
  ) -> Result<Vec<GroupCount>> {
    self.check_ready()?;
    tracing::debug!(scope, %version, "counting records");

    let scope   = scope.to_owned();
    let version = version.as_version().map(str::to_owned);

    let groups = self
      .conn
      .call(move |conn| {
        // Ties are broken by the first record seen for each group.
        let mut stmt = conn.prepare(
          "SELECT s.name, r.version, COUNT(r.id) AS n, MIN(r.id) AS first_seen
           FROM records r
           JOIN subjects s ON s.id = r.subject_id
           WHERE r.scope = ?1
             AND (?2 IS NULL OR r.version = ?2)
           GROUP BY s.name, r.version
           ORDER BY n DESC, first_seen ASC",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![scope, version], |row| {
            let count: i64 = row.get(2)?;
            Ok(GroupCount {
              name:    row.get(0)?,
              version: row.get(1)?,
              count:   count.unsigned_abs(),
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    Ok(groups)
  }

  async fn compute_top_stats(
    &self,
    scope:   &str,
    version: &VersionFilter,
  ) -> Result<Vec<VersionStats>> {
    let groups = self.group_counts(scope, version).await?;
    Ok(bucket_top_stats(groups, TOP_N))
  }
}
