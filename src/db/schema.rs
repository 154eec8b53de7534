//! Database schema and migrations for Solera.
//!
//! Migrations are applied sequentially when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script executed in order. The schema_version
/// table tracks which migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: Users table for authentication
    r#"
-- Users table for authentication and account management
CREATE TABLE users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,            -- self-describing hash string
    display_name  TEXT NOT NULL,
    email         TEXT,
    role          TEXT NOT NULL DEFAULT 'basico',  -- 'admin', 'supervisor', 'contabilidad', 'inventario', 'obras', 'basico'
    created_at    TEXT NOT NULL DEFAULT (datetime('now')),
    last_login    TEXT,
    is_active     INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX idx_users_username ON users(username);
CREATE INDEX idx_users_role ON users(role);
"#,
    // v2: Security events table for auditing
    r#"
-- Security events recorded by the auth layer (best effort)
CREATE TABLE security_events (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER,                    -- no FK: events may outlive accounts
    action      TEXT NOT NULL,              -- 'login_success', 'login_failed', 'logout', ...
    module      TEXT,
    detail      TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX idx_security_events_user_id ON security_events(user_id);
CREATE INDEX idx_security_events_created_at ON security_events(created_at);
"#,
];
