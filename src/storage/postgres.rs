//! PostgreSQL storage implementation.
//!
//! `sqlx` is async; the [`Storage`] contract is not. The adapter owns a
//! current-thread `tokio` runtime and a single-connection pool, and blocks on
//! each query. One connection is held for the lifetime of the session and the
//! pool is closed when the adapter is dropped.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

use crate::error::{Result, TodoError};
use crate::model::{ListRecord, Status, Task, User};
use crate::storage::Storage;
use crate::storage::schema::{POSTGRES_SCHEMA_SQL, REQUIRED_TABLES};
use crate::util::time;

const BACKEND: &str = "postgres";

const TASK_COLUMNS: &str =
    "id, description, status, created, due_date, notes, list_id, user_id";

pub const DEFAULT_PORT: u16 = 5432;

/// Connection parameters for the networked backend.
#[derive(Clone, PartialEq, Eq)]
pub struct PostgresConfig {
    pub host: String,
    pub user: String,
    pub password: String,
    pub db_name: String,
    pub port: u16,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("db_name", &self.db_name)
            .field("port", &self.port)
            .finish()
    }
}

impl PostgresConfig {
    #[must_use]
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.db_name)
    }
}

/// PostgreSQL-based storage backend.
#[derive(Debug)]
pub struct PostgresStorage {
    runtime: Runtime,
    pool: PgPool,
}

impl PostgresStorage {
    /// Connect to a provisioned database.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the server cannot be reached or the
    /// schema is missing.
    pub fn open(config: &PostgresConfig) -> Result<Self> {
        let storage = Self::connect(config)?;
        let missing = storage.missing_tables()?;
        if !missing.is_empty() {
            return Err(TodoError::StorageUnavailable {
                backend: BACKEND,
                reason: format!(
                    "database '{}' is missing tables [{}]; run `todoika init` first",
                    config.db_name,
                    missing.join(", ")
                ),
            });
        }
        Ok(storage)
    }

    /// Connect and provision the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or the DDL fails.
    pub fn create(config: &PostgresConfig) -> Result<Self> {
        let storage = Self::connect(config)?;
        for statement in POSTGRES_SCHEMA_SQL {
            storage
                .run(sqlx::raw_sql(statement).execute(&storage.pool))
                .map_err(classify)?;
        }
        debug!(db = %config.db_name, "Provisioned postgres storage");
        Ok(storage)
    }

    fn connect(config: &PostgresConfig) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TodoError::StorageUnavailable {
                backend: BACKEND,
                reason: format!("failed to start runtime: {e}"),
            })?;

        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(config.connect_options()),
            )
            .map_err(|e| TodoError::StorageUnavailable {
                backend: BACKEND,
                reason: e.to_string(),
            })?;

        debug!(host = %config.host, port = config.port, db = %config.db_name, "Connected to postgres");
        Ok(Self { runtime, pool })
    }

    fn run<T>(&self, fut: impl Future<Output = sqlx::Result<T>>) -> sqlx::Result<T> {
        self.runtime.block_on(fut)
    }

    fn missing_tables(&self) -> Result<Vec<&'static str>> {
        let present: Vec<String> = self
            .run(
                sqlx::query_scalar(
                    "SELECT table_name::text FROM information_schema.tables
                     WHERE table_schema = current_schema()",
                )
                .fetch_all(&self.pool),
            )
            .map_err(classify)?;

        Ok(REQUIRED_TABLES
            .iter()
            .copied()
            .filter(|table| !present.iter().any(|p| p == table))
            .collect())
    }

    fn user_exists(&self, user_id: i64) -> Result<bool> {
        let found: Option<i32> = self
            .run(
                sqlx::query_scalar("SELECT 1 FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool),
            )
            .map_err(classify)?;
        Ok(found.is_some())
    }

    fn update_task<'q, V>(&self, task_id: i64, sql: &'q str, value: V) -> Result<()>
    where
        V: 'q + Send + sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        let result = self
            .run(sqlx::query(sql).bind(value).bind(task_id).execute(&self.pool))
            .map_err(classify)?;
        if result.rows_affected() == 0 {
            return Err(TodoError::not_found("task", task_id));
        }
        Ok(())
    }
}

impl Drop for PostgresStorage {
    fn drop(&mut self) {
        self.runtime.block_on(self.pool.close());
        debug!("Closed postgres pool");
    }
}

impl Storage for PostgresStorage {
    fn backend_name(&self) -> &'static str {
        BACKEND
    }

    fn get_credential_hash_by_name(&self, name: &str) -> Result<Option<String>> {
        self.run(
            sqlx::query_scalar("SELECT password_hash FROM users WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool),
        )
        .map_err(classify)
    }

    fn create_user(&self, name: &str, credential_hash: &str) -> Result<User> {
        let db_id: i64 = self
            .run(
                sqlx::query_scalar(
                    "INSERT INTO users (name, password_hash) VALUES ($1, $2) RETURNING id",
                )
                .bind(name)
                .bind(credential_hash)
                .fetch_one(&self.pool),
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
        debug!(user_id = db_id, name, "Inserted user");

        Ok(User {
            db_id,
            name: name.to_string(),
            password_hash: credential_hash.to_string(),
            default_list_id: None,
        })
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let row = self
            .run(
                sqlx::query(
                    "SELECT id, name, password_hash, default_list_id FROM users WHERE name = $1",
                )
                .bind(name)
                .fetch_optional(&self.pool),
            )
            .map_err(classify)?;
        row.as_ref().map(user_from_row).transpose().map_err(classify)
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        let row = self
            .run(
                sqlx::query(
                    "SELECT id, name, password_hash, default_list_id FROM users WHERE id = $1",
                )
                .bind(user_id)
                .fetch_optional(&self.pool),
            )
            .map_err(classify)?;
        row.as_ref().map(user_from_row).transpose().map_err(classify)
    }

    fn create_list(&self, owner_user_id: i64, description: &str) -> Result<ListRecord> {
        let db_id: i64 = self
            .run(
                sqlx::query_scalar(
                    "INSERT INTO lists (description, user_id) VALUES ($1, $2) RETURNING id",
                )
                .bind(description)
                .bind(owner_user_id)
                .fetch_one(&self.pool),
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
        debug!(list_id = db_id, user_id = owner_user_id, description, "Inserted list");

        Ok(ListRecord {
            db_id,
            description: description.to_string(),
            owner_user_id,
        })
    }

    fn get_list(&self, list_id: i64) -> Result<Option<ListRecord>> {
        let row = self
            .run(
                sqlx::query("SELECT id, description, user_id FROM lists WHERE id = $1")
                    .bind(list_id)
                    .fetch_optional(&self.pool),
            )
            .map_err(classify)?;
        row.as_ref().map(list_from_row).transpose().map_err(classify)
    }

    fn list_lists_for_user(&self, user_id: i64) -> Result<Vec<ListRecord>> {
        let rows = self
            .run(
                sqlx::query(
                    "SELECT id, description, user_id FROM lists WHERE user_id = $1 ORDER BY id",
                )
                .bind(user_id)
                .fetch_all(&self.pool),
            )
            .map_err(classify)?;
        rows.iter()
            .map(list_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
            .map_err(classify)
    }

    fn set_default_list(&self, user_id: i64, list_id: i64) -> Result<()> {
        let result = self
            .run(
                sqlx::query(
                    "UPDATE users SET default_list_id = $1
                     WHERE id = $2
                       AND EXISTS (SELECT 1 FROM lists WHERE id = $1 AND user_id = $2)",
                )
                .bind(list_id)
                .bind(user_id)
                .execute(&self.pool),
            )
            .map_err(classify)?;

        if result.rows_affected() == 0 {
            if self.user_exists(user_id)? {
                return Err(TodoError::not_found("list", list_id));
            }
            return Err(TodoError::not_found("user", user_id));
        }
        debug!(user_id, list_id, "Set default list");
        Ok(())
    }

    fn list_tasks(&self, list_id: i64) -> Result<Vec<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE list_id = $1 ORDER BY id");
        let rows = self
            .run(sqlx::query(&sql).bind(list_id).fetch_all(&self.pool))
            .map_err(classify)?;
        let tasks = rows
            .iter()
            .map(task_from_row)
            .collect::<sqlx::Result<Vec<_>>>()
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
        let db_id: i64 = self
            .run(
                sqlx::query_scalar(
                    "INSERT INTO tasks (description, status, created, due_date, list_id, user_id)
                     SELECT $1, $2, $3, $4, l.id, l.user_id
                     FROM lists l WHERE l.id = $5 AND l.user_id = $6
                     RETURNING id",
                )
                .bind(description)
                .bind(Status::New.as_str())
                .bind(time::to_epoch(created))
                .bind(due_date.map(time::to_epoch))
                .bind(list_id)
                .bind(user_id)
                .fetch_optional(&self.pool),
            )
            .map_err(classify)?
            .ok_or_else(|| TodoError::not_found("list", list_id))?;
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
            "UPDATE tasks SET description = $1 WHERE id = $2",
            description,
        )
    }

    fn update_task_status(&self, task_id: i64, status: Status) -> Result<()> {
        self.update_task(
            task_id,
            "UPDATE tasks SET status = $1 WHERE id = $2",
            status.as_str(),
        )
    }

    fn update_task_due_date(&self, task_id: i64, due_date: Option<DateTime<Utc>>) -> Result<()> {
        let epoch = due_date.map(|d| time::to_epoch(time::normalize(d)));
        self.update_task(task_id, "UPDATE tasks SET due_date = $1 WHERE id = $2", epoch)
    }
}

fn user_from_row(row: &PgRow) -> sqlx::Result<User> {
    Ok(User {
        db_id: row.try_get("id")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        default_list_id: row.try_get("default_list_id")?,
    })
}

fn list_from_row(row: &PgRow) -> sqlx::Result<ListRecord> {
    Ok(ListRecord {
        db_id: row.try_get("id")?,
        description: row.try_get("description")?,
        owner_user_id: row.try_get("user_id")?,
    })
}

fn task_from_row(row: &PgRow) -> sqlx::Result<Task> {
    let status: String = row.try_get("status")?;
    let due_date: Option<i64> = row.try_get("due_date")?;
    Ok(Task {
        db_id: row.try_get("id")?,
        description: row.try_get("description")?,
        status: status
            .parse()
            .map_err(|_| decode_error("status", format!("unknown task status '{status}'")))?,
        created: parse_epoch("created", row.try_get("created")?)?,
        due_date: due_date
            .map(|secs| parse_epoch("due_date", secs))
            .transpose()?,
        notes: row.try_get("notes")?,
        list_id: row.try_get("list_id")?,
        user_id: row.try_get("user_id")?,
    })
}

fn parse_epoch(column: &str, secs: i64) -> sqlx::Result<DateTime<Utc>> {
    time::from_epoch(secs)
        .ok_or_else(|| decode_error(column, format!("timestamp out of range: {secs}")))
}

fn decode_error(column: &str, reason: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: reason.into(),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_foreign_key_violation())
}

/// Map transport-level failures to `StorageUnavailable`, keep the rest.
fn classify(err: sqlx::Error) -> TodoError {
    let transport = match &err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => true,
        // SQLSTATE class 08: connection exception; 57P0x: server shutting down.
        sqlx::Error::Database(db) => db
            .code()
            .is_some_and(|code| code.starts_with("08") || code.starts_with("57P0")),
        _ => false,
    };
    if transport {
        TodoError::StorageUnavailable {
            backend: BACKEND,
            reason: err.to_string(),
        }
    } else {
        TodoError::Postgres(err)
    }
}
