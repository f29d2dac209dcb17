//! SQL schema for the roster SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision; there is only one.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
///
/// `case_sensitive_like` is a per-connection setting, so it lives here rather
/// than in the database file.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA case_sensitive_like = ON;

-- AUTOINCREMENT keeps ids of deleted rows from being handed out again.
-- document_id is deliberately not UNIQUE: callers check before writing.
CREATE TABLE IF NOT EXISTS persons (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name     TEXT NOT NULL,
    document_id   TEXT NOT NULL,
    phone         TEXT NOT NULL,
    address       TEXT NOT NULL,
    district      TEXT NOT NULL,
    civil_status  TEXT              -- NULL = not specified
);

CREATE INDEX IF NOT EXISTS persons_full_name_idx   ON persons(full_name);
CREATE INDEX IF NOT EXISTS persons_document_id_idx ON persons(document_id);

PRAGMA user_version = 1;
";
