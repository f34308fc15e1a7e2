//! SQL schema for the Mayday SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per user; overwritten wholesale on every location report.
-- Rows are never deleted, and `active` is never cleared once set.
CREATE TABLE IF NOT EXISTS users (
    user_id      TEXT PRIMARY KEY,
    external_id  TEXT NOT NULL DEFAULT '',  -- push-provider alias
    latitude     REAL,                      -- NULL until first report
    longitude    REAL,
    device_type  TEXT NOT NULL DEFAULT 'android',
    last_update  TEXT NOT NULL,             -- ISO 8601 UTC; store-assigned
    active       INTEGER NOT NULL DEFAULT 1
);

-- Alert records are written once at trigger time.
-- The only UPDATE ever issued is the single transition into 'cancelled'.
CREATE TABLE IF NOT EXISTS alerts (
    id            TEXT PRIMARY KEY,
    alert_id      TEXT NOT NULL,   -- provider id, 'no_recipients' or 'unknown'
    sender_id     TEXT NOT NULL,
    latitude      REAL NOT NULL,
    longitude     REAL NOT NULL,
    radius_meters REAL NOT NULL,
    message       TEXT NOT NULL,
    status        TEXT NOT NULL,   -- 'dispatched' | 'no_recipients' | 'cancelled'
    outcome       TEXT,            -- JSON DispatchOutcome or NULL
    recipients    TEXT NOT NULL DEFAULT '[]',
    created_at    TEXT NOT NULL,   -- ISO 8601 UTC; store-assigned
    cancelled_at  TEXT
);

CREATE INDEX IF NOT EXISTS users_active_idx   ON users(active);
CREATE INDEX IF NOT EXISTS alerts_sender_idx  ON alerts(sender_id);
CREATE INDEX IF NOT EXISTS alerts_created_idx ON alerts(created_at);

PRAGMA user_version = 1;
";
