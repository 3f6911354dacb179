//! Database schema definitions and provisioning.
//!
//! Adapters never migrate on open; provisioning is an explicit step
//! (`todoika init`). Every statement is idempotent and nothing is dropped.

use rusqlite::{Connection, Result};

pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Default description of the list created at registration.
pub const DEFAULT_LIST_DESCRIPTION: &str = "Default";

/// The SQLite schema.
///
/// `users.default_list_id` references `lists` before that table exists;
/// SQLite resolves foreign keys at write time, so the order is fine.
pub const SQLITE_SCHEMA_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        default_list_id INTEGER REFERENCES lists(id)
    );

    CREATE TABLE IF NOT EXISTS lists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL CHECK(length(description) > 0),
        user_id INTEGER NOT NULL REFERENCES users(id),
        UNIQUE (user_id, description)
    );

    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL CHECK(length(description) > 0),
        status TEXT NOT NULL DEFAULT 'NEW' CHECK(status IN ('NEW', 'DONE')),
        created INTEGER NOT NULL,
        due_date INTEGER,
        notes TEXT,
        list_id INTEGER NOT NULL REFERENCES lists(id),
        user_id INTEGER NOT NULL REFERENCES users(id)
    );

    CREATE INDEX IF NOT EXISTS idx_lists_user ON lists(user_id);
    CREATE INDEX IF NOT EXISTS idx_tasks_list ON tasks(list_id);
";

/// The PostgreSQL schema, one statement per entry.
///
/// The `users -> lists` foreign key is added after both tables exist, guarded
/// so that re-running provisioning is a no-op.
pub const POSTGRES_SCHEMA_SQL: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        default_list_id BIGINT
    )",
    r"CREATE TABLE IF NOT EXISTS lists (
        id BIGSERIAL PRIMARY KEY,
        description TEXT NOT NULL CHECK (length(description) > 0),
        user_id BIGINT NOT NULL REFERENCES users (id),
        CONSTRAINT uq_lists UNIQUE (user_id, description)
    )",
    r"CREATE TABLE IF NOT EXISTS tasks (
        id BIGSERIAL PRIMARY KEY,
        description TEXT NOT NULL CHECK (length(description) > 0),
        status TEXT NOT NULL DEFAULT 'NEW' CHECK (status IN ('NEW', 'DONE')),
        created BIGINT NOT NULL,
        due_date BIGINT,
        notes TEXT,
        list_id BIGINT NOT NULL REFERENCES lists (id),
        user_id BIGINT NOT NULL REFERENCES users (id)
    )",
    r"DO $$
    BEGIN
        IF NOT EXISTS (
            SELECT 1 FROM pg_constraint WHERE conname = 'fk_users_default_list'
        ) THEN
            ALTER TABLE users
                ADD CONSTRAINT fk_users_default_list
                FOREIGN KEY (default_list_id) REFERENCES lists (id);
        END IF;
    END $$",
    r"CREATE INDEX IF NOT EXISTS idx_lists_user ON lists (user_id)",
    r"CREATE INDEX IF NOT EXISTS idx_tasks_list ON tasks (list_id)",
];

/// Tables every backend must expose.
pub const REQUIRED_TABLES: &[&str] = &["users", "lists", "tasks"];

/// Create the SQLite tables if they are missing.
///
/// # Errors
///
/// Returns an error if any DDL statement fails.
pub fn apply_sqlite_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SQLITE_SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", CURRENT_SCHEMA_VERSION)?;
    Ok(())
}

/// Names of required tables missing from a SQLite database.
#[must_use]
pub fn missing_sqlite_tables(conn: &Connection) -> Vec<&'static str> {
    REQUIRED_TABLES
        .iter()
        .copied()
        .filter(|table| !table_exists(conn, table))
        .collect()
}

fn table_exists(conn: &Connection, table: &str) -> bool {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?")
        .and_then(|mut stmt| stmt.exists([table]))
        .unwrap_or(false)
}
