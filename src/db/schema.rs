//! Database schema and migrations for feedbell.
//!
//! Migrations are applied in order when the database is opened. The
//! schema_version table tracks which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: users, subscriptions and the scan watermark
    r#"
-- Chat users; the id is the chat identifier notifications are sent to
CREATE TABLE users (
    id          TEXT PRIMARY KEY,
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Feed subscriptions; a URL may be stored only once across all users
CREATE TABLE subscriptions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    seq         INTEGER NOT NULL,            -- per-user handle, 1-based
    title       TEXT NOT NULL,               -- captured at subscribe time
    url         TEXT NOT NULL UNIQUE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE(user_id, seq)
);

CREATE INDEX idx_subscriptions_user_id ON subscriptions(user_id);

-- Single-row table holding the global scan watermark
CREATE TABLE watermark (
    id          INTEGER PRIMARY KEY CHECK (id = 1),
    value       TEXT NOT NULL,               -- RFC 3339 with zone offset
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
];
