//! `SQLite` storage implementation.

use crate::error::{Result, TodoError};
use crate::model::{ListRecord, Status, Task, User};
use crate::storage::Storage;
use crate::storage::schema::{apply_sqlite_schema, missing_sqlite_tables};
use crate::util::time;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

const BACKEND: &str = "sqlite";

const TASK_COLUMNS: &str =
    "id, description, status, created, due_date, notes, list_id, user_id";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Open an existing, provisioned database file.
    ///
    /// The file is never created here; a missing file or missing tables is
    /// reported as `StorageUnavailable`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or lacks the schema.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags).map_err(|e| unavailable(&e))?;
        let storage = Self::from_connection(conn)?;

        let missing = missing_sqlite_tables(&storage.conn);
        if !missing.is_empty() {
            return Err(TodoError::StorageUnavailable {
                backend: BACKEND,
                reason: format!(
                    "{} is missing tables [{}]; run `todoika init` first",
                    path.display(),
                    missing.join(", ")
                ),
            });
        }

        debug!(path = %path.display(), "Opened sqlite storage");
        Ok(storage)
    }

    /// Create (if needed) and provision a database file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or the DDL fails.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| unavailable(&e))?;
        let storage = Self::from_connection(conn)?;
        apply_sqlite_schema(&storage.conn)?;
        debug!(path = %path.display(), "Provisioned sqlite storage");
        Ok(storage)
    }

    /// Open a provisioned in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| unavailable(&e))?;
        let storage = Self::from_connection(conn)?;
        apply_sqlite_schema(&storage.conn)?;
        Ok(storage)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| unavailable(&e))?;
        Ok(Self { conn })
    }

    fn user_exists(&self, user_id: i64) -> Result<bool> {
        let found = self
            .conn
            .query_row("SELECT 1 FROM users WHERE id = ?", [user_id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn update_task(&self, task_id: i64, sql: &str, value: &dyn rusqlite::ToSql) -> Result<()> {
        let changed = self
            .conn
            .execute(sql, params![value, task_id])
            .map_err(classify)?;
        if changed == 0 {
            return Err(TodoError::not_found("task", task_id));
        }
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn get_credential_hash_by_name(&self, name: &str) -> Result<Option<String>> {
        let hash = self
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE name = ?",
                [name],
                |row| row.get(0),
            )
            .optional()
            .map_err(classify)?;
        Ok(hash)
    }

    fn create_user(&self, name: &str, credential_hash: &str) -> Result<User> {
        self.conn
            .execute(
                "INSERT INTO users (name, password_hash) VALUES (?, ?)",
                params![name, credential_hash],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TodoError::DuplicateName {
                        name: name.to_string(),
                    }
                } else {
                    classify(e)
                }
            })?;
        let db_id = self.conn.last_insert_rowid();
        debug!(user_id = db_id, name, "Inserted user");

        Ok(User {
            db_id,
            name: name.to_string(),
            password_hash: credential_hash.to_string(),
            default_list_id: None,
        })
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, password_hash, default_list_id FROM users WHERE name = ?",
                [name],
                user_from_row,
            )
            .optional()
            .map_err(classify)?;
        Ok(user)
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, password_hash, default_list_id FROM users WHERE id = ?",
                [user_id],
                user_from_row,
            )
            .optional()
            .map_err(classify)?;
        Ok(user)
    }

    fn create_list(&self, owner_user_id: i64, description: &str) -> Result<ListRecord> {
        self.conn
            .execute(
                "INSERT INTO lists (description, user_id) VALUES (?, ?)",
                params![description, owner_user_id],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    TodoError::DuplicateList {
                        user_id: owner_user_id,
                        description: description.to_string(),
                    }
                } else if is_foreign_key_violation(&e) {
                    TodoError::not_found("user", owner_user_id)
                } else {
                    classify(e)
                }
            })?;
        let db_id = self.conn.last_insert_rowid();
        debug!(list_id = db_id, user_id = owner_user_id, description, "Inserted list");

        Ok(ListRecord {
            db_id,
            description: description.to_string(),
            owner_user_id,
        })
    }

    fn get_list(&self, list_id: i64) -> Result<Option<ListRecord>> {
        let list = self
            .conn
            .query_row(
                "SELECT id, description, user_id FROM lists WHERE id = ?",
                [list_id],
                list_from_row,
            )
            .optional()
            .map_err(classify)?;
        Ok(list)
    }

    fn list_lists_for_user(&self, user_id: i64) -> Result<Vec<ListRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, description, user_id FROM lists WHERE user_id = ? ORDER BY id")
            .map_err(classify)?;
        let lists = stmt
            .query_map([user_id], list_from_row)
            .map_err(classify)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(classify)?;
        Ok(lists)
    }

    fn set_default_list(&self, user_id: i64, list_id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET default_list_id = ?1
                 WHERE id = ?2
                   AND EXISTS (SELECT 1 FROM lists WHERE id = ?1 AND user_id = ?2)",
                params![list_id, user_id],
            )
            .map_err(classify)?;

        if changed == 0 {
            if self.user_exists(user_id)? {
                return Err(TodoError::not_found("list", list_id));
            }
            return Err(TodoError::not_found("user", user_id));
        }
        debug!(user_id, list_id, "Set default list");
        Ok(())
    }

    fn list_tasks(&self, list_id: i64) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE list_id = ? ORDER BY id");
        let mut stmt = self.conn.prepare(&sql).map_err(classify)?;
        let tasks = stmt
            .query_map([list_id], task_from_row)
            .map_err(classify)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(classify)?;
        debug!(list_id, count = tasks.len(), "Loaded tasks");
        Ok(tasks)
    }

    fn create_task(
        &self,
        list_id: i64,
        user_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task> {
        let created = time::now();
        let due_date = due_date.map(time::normalize);

        // The list must belong to `user_id`; otherwise nothing is inserted.
        let inserted = self
            .conn
            .execute(
                "INSERT INTO tasks (description, status, created, due_date, list_id, user_id)
                 SELECT ?1, ?2, ?3, ?4, l.id, l.user_id
                 FROM lists l WHERE l.id = ?5 AND l.user_id = ?6",
                params![
                    description,
                    Status::New.as_str(),
                    time::to_epoch(created),
                    due_date.map(time::to_epoch),
                    list_id,
                    user_id,
                ],
            )
            .map_err(classify)?;
        if inserted == 0 {
            return Err(TodoError::not_found("list", list_id));
        }
        let db_id = self.conn.last_insert_rowid();
        debug!(task_id = db_id, list_id, "Inserted task");

        Ok(Task {
            db_id,
            description: description.to_string(),
            status: Status::New,
            created,
            due_date,
            notes: None,
            list_id,
            user_id,
        })
    }

    fn update_task_description(&self, task_id: i64, description: &str) -> Result<()> {
        self.update_task(
            task_id,
            "UPDATE tasks SET description = ? WHERE id = ?",
            &description,
        )
    }

    fn update_task_status(&self, task_id: i64, status: Status) -> Result<()> {
        self.update_task(
            task_id,
            "UPDATE tasks SET status = ? WHERE id = ?",
            &status.as_str(),
        )
    }

    fn update_task_due_date(&self, task_id: i64, due_date: Option<DateTime<Utc>>) -> Result<()> {
        let epoch = due_date.map(|d| time::to_epoch(time::normalize(d)));
        self.update_task(task_id, "UPDATE tasks SET due_date = ? WHERE id = ?", &epoch)
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        db_id: row.get(0)?,
        name: row.get(1)?,
        password_hash: row.get(2)?,
        default_list_id: row.get(3)?,
    })
}

fn list_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ListRecord> {
    Ok(ListRecord {
        db_id: row.get(0)?,
        description: row.get(1)?,
        owner_user_id: row.get(2)?,
    })
}

fn task_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        db_id: row.get(0)?,
        description: row.get(1)?,
        status: parse_status(2, &row.get::<_, String>(2)?)?,
        created: parse_epoch(3, row.get(3)?)?,
        due_date: row
            .get::<_, Option<i64>>(4)?
            .map(|secs| parse_epoch(4, secs))
            .transpose()?,
        notes: row.get(5)?,
        list_id: row.get(6)?,
        user_id: row.get(7)?,
    })
}

fn parse_status(column: usize, s: &str) -> rusqlite::Result<Status> {
    s.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Text,
            format!("unknown task status '{s}'").into(),
        )
    })
}

fn parse_epoch(column: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    time::from_epoch(secs).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Integer,
            format!("timestamp out of range: {secs}").into(),
        )
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
    )
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    )
}

/// Map transport-level failures to `StorageUnavailable`, keep the rest.
fn classify(err: rusqlite::Error) -> TodoError {
    let transport = matches!(
        &err,
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(
                e.code,
                ErrorCode::CannotOpen
                    | ErrorCode::DatabaseBusy
                    | ErrorCode::DatabaseLocked
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::ReadOnly
            )
    );
    if transport {
        unavailable(&err)
    } else {
        TodoError::Database(err)
    }
}

fn unavailable(err: &rusqlite::Error) -> TodoError {
    TodoError::StorageUnavailable {
        backend: BACKEND,
        reason: err.to_string(),
    }
}
