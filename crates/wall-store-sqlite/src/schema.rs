//! SQL schema for the Wall SQLite store.
//!
//! [`META_SCHEMA`] is declared on every startup. [`LATEST_SCHEMA`] is the full
//! current-version shape, declared on first run only; existing stores reach
//! the same shape through the steps in [`crate::migrate`].

/// Per-connection settings; must run on every open.
pub const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// The singleton metadata table; idempotent.
pub const META_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS wall_meta (
    id             INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version TEXT
);
";

/// Subjects and records at [`crate::LATEST_VERSION`]; idempotent thanks to
/// `IF NOT EXISTS`.
pub const LATEST_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS subjects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    name        TEXT    NOT NULL,
    scope       TEXT    NOT NULL,
    is_tracking INTEGER NOT NULL DEFAULT 0
);

CREATE UNIQUE INDEX IF NOT EXISTS subjects_name_scope_idx ON subjects(name, scope);

-- Append-mostly; rows are only ever inserted or deleted by id.
CREATE TABLE IF NOT EXISTS records (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    subject_id  INTEGER NOT NULL REFERENCES subjects(id),
    text        TEXT    NOT NULL,
    occurred_at TEXT,             -- RFC 3339 UTC; NULL for batch imports
    scope       TEXT    NOT NULL,
    version     TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS records_scope_version_idx ON records(scope, version);
CREATE INDEX IF NOT EXISTS records_subject_idx       ON records(subject_id);
";

pub const SELECT_VERSION: &str = "SELECT schema_version FROM wall_meta WHERE id = 1";

/// How many of `subjects` and `records` already exist.
pub const COUNT_DATA_TABLES: &str = "
SELECT COUNT(*) FROM sqlite_master
WHERE type = 'table' AND name IN ('subjects', 'records')
";

pub const WRITE_VERSION: &str = "
INSERT INTO wall_meta (id, schema_version) VALUES (1, ?1)
ON CONFLICT (id) DO UPDATE SET schema_version = excluded.schema_version
";

/// Removes everything but the metadata table, which is emptied.
pub const DROP_DATA: &str = "
DROP TABLE IF EXISTS records;
DROP TABLE IF EXISTS subjects;
DELETE FROM wall_meta;
";
