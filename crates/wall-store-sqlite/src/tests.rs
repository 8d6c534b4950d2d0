//! Integration tests for `SqliteStore` against in-memory databases.

use chrono::{TimeZone as _, Utc};
use wall_core::{
  record::NewRecord,
  schema::SchemaState,
  store::{RecordQuery, VersionFilter, WallStore},
};

use crate::{Error, LATEST_VERSION, SqliteStore, migrate::MIGRATIONS};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// The shape stores were created with before any migration existed.
const SCHEMA_1_0_0: &str = "
CREATE TABLE wall_meta (
    id             INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version TEXT
);
CREATE TABLE subjects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    scope       TEXT    NOT NULL,
    is_tracking INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id  INTEGER NOT NULL REFERENCES subjects(id),
    desription  TEXT    NOT NULL,
    occurred_at TEXT,
    scope       TEXT    NOT NULL,
    version     TEXT    NOT NULL
);
";

/// An unmigrated store holding legacy data, stamped at `version`.
async fn legacy_store(ddl: &'static str, version: &'static str) -> SqliteStore {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::from_connection(conn).await.unwrap();
  s.conn
    .call(move |conn| {
      conn.execute_batch(ddl)?;
      conn.execute(
        "INSERT INTO wall_meta (id, schema_version) VALUES (1, ?1)",
        rusqlite::params![version],
      )?;
      Ok(())
    })
    .await
    .unwrap();
  s
}

async fn stored_version(s: &SqliteStore) -> Option<String> {
  s.conn
    .call(|conn| {
      Ok(conn.query_row("SELECT schema_version FROM wall_meta WHERE id = 1", [], |r| r.get(0))?)
    })
    .await
    .unwrap()
}

async fn meta_rows(s: &SqliteStore) -> i64 {
  s.conn
    .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM wall_meta", [], |r| r.get(0))?))
    .await
    .unwrap()
}

/// Record `count` entries for `name` in `scope`/`version`.
async fn add(s: &SqliteStore, scope: &str, version: &str, name: &str, count: usize) {
  let subject = s.upsert_subject(name, scope).await.unwrap();
  for i in 0..count {
    s.record(NewRecord::new(subject.id, scope, version, format!("{name} #{i}")))
      .await
      .unwrap();
  }
}

// ─── Schema version manager ──────────────────────────────────────────────────

#[tokio::test]
async fn fresh_store_is_initialised_at_latest() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::from_connection(conn).await.unwrap();

  let state = s.ensure_schema().await.unwrap();
  assert_eq!(state, SchemaState::Initialized { version: LATEST_VERSION.into() });
  assert_eq!(stored_version(&s).await.as_deref(), Some(LATEST_VERSION));
  assert_eq!(meta_rows(&s).await, 1);
}

#[tokio::test]
async fn ensure_schema_is_idempotent() {
  let s = store().await;
  add(&s, "guildA", "4.5", "March", 2).await;

  for _ in 0..2 {
    let state = s.ensure_schema().await.unwrap();
    assert_eq!(state, SchemaState::Current { version: LATEST_VERSION.into() });
  }

  assert_eq!(meta_rows(&s).await, 1);
  let rows = s
    .list_records(&RecordQuery { scope: "guildA".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn null_version_is_treated_as_uninitialised() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::from_connection(conn).await.unwrap();
  s.conn
    .call(|conn| {
      conn.execute_batch(crate::schema::META_SCHEMA)?;
      conn.execute("INSERT INTO wall_meta (id, schema_version) VALUES (1, NULL)", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let state = s.ensure_schema().await.unwrap();
  assert!(matches!(state, SchemaState::Initialized { .. }));
  assert_eq!(meta_rows(&s).await, 1);
}

#[tokio::test]
async fn null_version_over_existing_tables_is_drift() {
  let s = legacy_store(SCHEMA_1_0_0, "1_0_0").await;
  s.conn
    .call(|conn| {
      conn.execute("UPDATE wall_meta SET schema_version = NULL WHERE id = 1", [])?;
      Ok(())
    })
    .await
    .unwrap();

  let err = s.ensure_schema().await.unwrap_err();
  assert!(matches!(err, Error::SchemaDrift { ref found } if found == "NULL"));

  // Nothing was stamped over the legacy tables.
  assert_eq!(stored_version(&s).await, None);
  let err = s.upsert_subject("March", "guildA").await.unwrap_err();
  assert!(matches!(err, Error::SchemaNotReady));

  // Reset is the way out.
  let state = s.reset().await.unwrap();
  assert!(matches!(state, SchemaState::Initialized { .. }));
  add(&s, "guildA", "4.5", "March", 1).await;
}

#[tokio::test]
async fn migrates_full_chain_from_first_version() {
  let s = legacy_store(SCHEMA_1_0_0, "1_0_0").await;
  s.conn
    .call(|conn| {
      conn.execute_batch(
        "INSERT INTO subjects (name, scope, is_tracking) VALUES ('March', 'guildA', 1);
         INSERT INTO records (subject_id, desription, scope, version)
           VALUES (1, 'too slow', 'guildA', '4.5');",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let state = s.ensure_schema().await.unwrap();
  assert_eq!(
    state,
    SchemaState::Migrated {
      from:  "1_0_0".into(),
      to:    LATEST_VERSION.into(),
      steps: MIGRATIONS.len(),
    }
  );
  assert_eq!(stored_version(&s).await.as_deref(), Some(LATEST_VERSION));

  // Legacy text survives the column rename.
  let rows = s
    .list_records(&RecordQuery { scope: "guildA".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].text, "too slow");
  assert_eq!(rows[0].subject_name, "March");

  // A second startup is a no-op.
  assert!(matches!(s.ensure_schema().await.unwrap(), SchemaState::Current { .. }));
}

#[tokio::test]
async fn intermediate_version_resumes_remaining_steps() {
  let ddl_1_1_0: &'static str = "
    CREATE TABLE wall_meta (id INTEGER PRIMARY KEY CHECK (id = 1), schema_version TEXT);
    CREATE TABLE subjects (
        id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL,
        scope TEXT NOT NULL, is_tracking INTEGER NOT NULL DEFAULT 0);
    CREATE TABLE records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        subject_id INTEGER NOT NULL REFERENCES subjects(id), text TEXT NOT NULL,
        occurred_at TEXT, scope TEXT NOT NULL, version TEXT NOT NULL);
  ";
  let s = legacy_store(ddl_1_1_0, "1_1_0").await;

  let state = s.ensure_schema().await.unwrap();
  assert_eq!(
    state,
    SchemaState::Migrated { from: "1_1_0".into(), to: LATEST_VERSION.into(), steps: 1 }
  );
}

#[tokio::test]
async fn duplicate_subjects_are_merged_during_migration() {
  let s = legacy_store(SCHEMA_1_0_0, "1_0_0").await;
  s.conn
    .call(|conn| {
      conn.execute_batch(
        "INSERT INTO subjects (name, scope, is_tracking) VALUES ('March', 'guildA', 1);
         INSERT INTO subjects (name, scope, is_tracking) VALUES ('March', 'guildA', 1);
         INSERT INTO subjects (name, scope, is_tracking) VALUES ('March', 'guildB', 1);
         INSERT INTO records (subject_id, desription, scope, version) VALUES (1, 'a', 'guildA', '4.5');
         INSERT INTO records (subject_id, desription, scope, version) VALUES (2, 'b', 'guildA', '4.5');
         INSERT INTO records (subject_id, desription, scope, version) VALUES (3, 'c', 'guildB', '4.5');",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  s.ensure_schema().await.unwrap();

  let groups = s.group_counts("guildA", &VersionFilter::All).await.unwrap();
  assert_eq!(groups.len(), 1);
  assert_eq!(groups[0].count, 2);

  assert!(s.get_subject(2).await.unwrap().is_none());
  assert_eq!(s.get_subject(3).await.unwrap().unwrap().scope, "guildB");

  // The unique constraint now holds.
  let again = s.upsert_subject("March", "guildA").await.unwrap();
  assert_eq!(again.id, 1);
}

#[tokio::test]
async fn unknown_version_fails_without_writing() {
  let s = legacy_store(SCHEMA_1_0_0, "0_9_9").await;

  let err = s.ensure_schema().await.unwrap_err();
  assert!(matches!(err, Error::SchemaDrift { ref found } if found == "0_9_9"));

  // Nothing moved: the version is untouched and the legacy column remains.
  assert_eq!(stored_version(&s).await.as_deref(), Some("0_9_9"));
  let legacy_column: i64 = s
    .conn
    .call(|conn| {
      Ok(conn.query_row(
        "SELECT COUNT(*) FROM pragma_table_info('records') WHERE name = 'desription'",
        [],
        |r| r.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(legacy_column, 1);

  // And the store refuses to serve.
  let err = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap_err();
  assert!(matches!(err, Error::SchemaNotReady));
}

#[tokio::test]
async fn data_access_requires_ensure_schema() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let s = SqliteStore::from_connection(conn).await.unwrap();

  let err = s.upsert_subject("March", "guildA").await.unwrap_err();
  assert!(matches!(err, Error::SchemaNotReady));
  let err = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap_err();
  assert!(matches!(err, Error::SchemaNotReady));
}

#[tokio::test]
async fn reset_drops_data_and_reinitialises() {
  let s = store().await;
  add(&s, "guildA", "4.5", "March", 3).await;

  let state = s.reset().await.unwrap();
  assert!(matches!(state, SchemaState::Initialized { .. }));
  assert_eq!(meta_rows(&s).await, 1);

  let stats = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap();
  assert!(stats.is_empty());
  let subject = s.upsert_subject("March", "guildA").await.unwrap();
  assert_eq!(subject.id, 1);
}

// ─── Subjects ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_subject_never_duplicates() {
  let s = store().await;

  let first = s.upsert_subject("March", "guildA").await.unwrap();
  let second = s.upsert_subject("March", "guildA").await.unwrap();
  assert_eq!(first, second);
  assert!(first.is_tracking);

  let other_scope = s.upsert_subject("March", "guildB").await.unwrap();
  assert_ne!(other_scope.id, first.id);
  assert_eq!(other_scope.scope, "guildB");
}

#[tokio::test]
async fn get_subject_missing_returns_none() {
  let s = store().await;
  assert!(s.get_subject(42).await.unwrap().is_none());
}

// ─── Records ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn record_roundtrips_timestamp() {
  let s = store().await;
  let subject = s.upsert_subject("March", "guildA").await.unwrap();
  let at = Utc.with_ymd_and_hms(2024, 4, 1, 8, 0, 0).unwrap();

  let rec = s
    .record(NewRecord::new(subject.id, "guildA", "4.5", "too slow").occurred_at(at))
    .await
    .unwrap();
  assert_eq!(rec.subject_id, subject.id);

  let rows = s
    .list_records(&RecordQuery { scope: "guildA".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].id, rec.id);
  assert_eq!(rows[0].occurred_at, Some(at));
}

#[tokio::test]
async fn record_for_missing_subject_is_rejected() {
  let s = store().await;
  let err = s
    .record(NewRecord::new(99, "guildA", "4.5", "orphan"))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Core(wall_core::Error::SubjectNotFound(99))));
}

#[tokio::test]
async fn record_in_foreign_scope_is_rejected() {
  let s = store().await;
  let subject = s.upsert_subject("March", "guildA").await.unwrap();

  let err = s
    .record(NewRecord::new(subject.id, "guildB", "4.5", "wrong guild"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Core(wall_core::Error::ScopeMismatch { ref found, .. }) if found == "guildA"
  ));
}

#[tokio::test]
async fn list_records_filters_by_version_and_name() {
  let s = store().await;
  add(&s, "guildA", "4.3", "March", 1).await;
  add(&s, "guildA", "4.5", "March", 2).await;
  add(&s, "guildA", "4.5", "Kaveh", 1).await;

  let all = s
    .list_records(&RecordQuery { scope: "guildA".into(), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 4);

  let march_45 = s
    .list_records(&RecordQuery {
      scope:        "guildA".into(),
      version:      VersionFilter::Only("4.5".into()),
      subject_name: Some("March".into()),
    })
    .await
    .unwrap();
  assert_eq!(march_45.len(), 2);
  assert!(march_45.iter().all(|r| r.subject_name == "March" && r.version == "4.5"));
}

#[tokio::test]
async fn removed_records_leave_the_counts() {
  let s = store().await;
  let subject = s.upsert_subject("March", "guildA").await.unwrap();
  let rec = s
    .record(NewRecord::new(subject.id, "guildA", "4.5", "gone soon"))
    .await
    .unwrap();

  assert!(s.remove_record(rec.id).await.unwrap());
  assert!(!s.remove_record(rec.id).await.unwrap());

  let stats = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap();
  assert!(stats.is_empty());
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn top_four_plus_others() {
  let s = store().await;
  let counts = [10, 9, 8, 7, 6, 5, 4];
  for (i, n) in counts.into_iter().enumerate() {
    add(&s, "guildA", "4.5", &format!("subject{i}"), n).await;
  }

  let stats = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap();
  assert_eq!(stats.len(), 1);

  let kept: Vec<u64> = stats[0].entries.iter().map(|e| e.count).collect();
  assert_eq!(kept, [10, 9, 8, 7]);
  assert_eq!(stats[0].others_count, 15);
  assert_eq!(stats[0].entries[0].label, "subject0 (v4.5)");
}

#[tokio::test]
async fn exactly_four_subjects_have_no_others() {
  let s = store().await;
  for (i, n) in [1, 20, 3, 4].into_iter().enumerate() {
    add(&s, "guildA", "4.5", &format!("subject{i}"), n).await;
  }

  let stats = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap();
  assert_eq!(stats[0].entries.len(), 4);
  assert!(stats[0].others().is_none());
}

#[tokio::test]
async fn scopes_are_isolated() {
  let s = store().await;
  add(&s, "guildA", "4.5", "March", 3).await;
  add(&s, "guildB", "4.5", "March", 1).await;
  add(&s, "guildB", "4.5", "Kaveh", 2).await;

  let a = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap();
  assert_eq!(a[0].entries.len(), 1);
  assert_eq!(a[0].entries[0].count, 3);

  let b = s.compute_top_stats("guildB", &VersionFilter::All).await.unwrap();
  let b_counts: Vec<(&str, u64)> =
    b[0].entries.iter().map(|e| (e.name.as_str(), e.count)).collect();
  assert_eq!(b_counts, [("Kaveh", 2), ("March", 1)]);
}

#[tokio::test]
async fn all_versions_are_bucketed_independently() {
  let s = store().await;
  for (i, n) in [5, 4, 3, 2, 1].into_iter().enumerate() {
    add(&s, "guildA", "4.3", &format!("old{i}"), n).await;
  }
  for (i, n) in [6, 2].into_iter().enumerate() {
    add(&s, "guildA", "4.5", &format!("new{i}"), n).await;
  }

  let stats = s.compute_top_stats("guildA", &VersionFilter::All).await.unwrap();
  assert_eq!(stats.len(), 2);

  let v43 = stats.iter().find(|b| b.version == "4.3").unwrap();
  assert_eq!(v43.entries.len(), 4);
  assert_eq!(v43.others_count, 1);

  let v45 = stats.iter().find(|b| b.version == "4.5").unwrap();
  assert_eq!(v45.entries.len(), 2);
  assert_eq!(v45.others_count, 0);

  let only = s
    .compute_top_stats("guildA", &VersionFilter::Only("4.5".into()))
    .await
    .unwrap();
  assert_eq!(only.len(), 1);
  assert_eq!(only[0].version, "4.5");
}

#[tokio::test]
async fn unmatched_version_is_empty_not_error() {
  let s = store().await;
  add(&s, "guildA", "4.5", "March", 2).await;

  let stats = s
    .compute_top_stats("guildA", &VersionFilter::Only("9.9".into()))
    .await
    .unwrap();
  assert!(stats.is_empty());
}

#[tokio::test]
async fn equal_counts_rank_by_first_seen() {
  let s = store().await;
  add(&s, "guildA", "4.5", "Early", 2).await;
  add(&s, "guildA", "4.5", "Late", 2).await;

  let groups = s.group_counts("guildA", &VersionFilter::All).await.unwrap();
  let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
  assert_eq!(names, ["Early", "Late"]);
}

#[tokio::test]
async fn uppercase_all_is_a_literal_version() {
  let s = store().await;
  add(&s, "guildA", "ALL", "March", 3).await;
  add(&s, "guildA", "4.5", "Alucard", 1).await;

  let filter: VersionFilter = "ALL".parse().unwrap();
  let stats = s.compute_top_stats("guildA", &filter).await.unwrap();
  assert_eq!(stats.len(), 1);
  assert_eq!(stats[0].version, "ALL");
  assert_eq!(stats[0].entries[0].count, 3);
}
