#![allow(dead_code)]

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::Once;

use chrono::{DateTime, Utc};
use tempfile::TempDir;
use todoika::Result;
use todoika::TodoError;
use todoika::model::{ListRecord, Status, Task, User};
use todoika::storage::{SqliteStorage, Storage};

static INIT: Once = Once::new();

pub fn init_test_logging() {
    INIT.call_once(|| {
        todoika::logging::init_test_logging();
    });
}

pub fn test_db() -> SqliteStorage {
    init_test_logging();
    SqliteStorage::open_memory().expect("Failed to create test database")
}

pub fn test_db_with_dir() -> (SqliteStorage, TempDir) {
    init_test_logging();
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::create(&db_path(dir.path())).expect("Failed to create test database");
    (storage, dir)
}

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join("todoika.db")
}

/// Write a config file pointing at a SQLite database inside `dir`.
pub fn write_sqlite_config(dir: &Path) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        "[database]\ndb_type = \"SQLite\"\nname = \"todoika.db\"\n",
    )
    .expect("write config");
    path
}

/// Forwards to an inner store and counts every call.
pub struct CountingStorage<S> {
    inner: S,
    calls: Cell<usize>,
}

impl<S: Storage> CountingStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn reset(&self) {
        self.calls.set(0);
    }

    fn tick(&self) -> &S {
        self.calls.set(self.calls.get() + 1);
        &self.inner
    }
}

impl<S: Storage> Storage for CountingStorage<S> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn get_credential_hash_by_name(&self, name: &str) -> Result<Option<String>> {
        self.tick().get_credential_hash_by_name(name)
    }

    fn create_user(&self, name: &str, credential_hash: &str) -> Result<User> {
        self.tick().create_user(name, credential_hash)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.tick().get_user_by_name(name)
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.tick().get_user(user_id)
    }

    fn create_list(&self, owner_user_id: i64, description: &str) -> Result<ListRecord> {
        self.tick().create_list(owner_user_id, description)
    }

    fn get_list(&self, list_id: i64) -> Result<Option<ListRecord>> {
        self.tick().get_list(list_id)
    }

    fn list_lists_for_user(&self, user_id: i64) -> Result<Vec<ListRecord>> {
        self.tick().list_lists_for_user(user_id)
    }

    fn set_default_list(&self, user_id: i64, list_id: i64) -> Result<()> {
        self.tick().set_default_list(user_id, list_id)
    }

    fn list_tasks(&self, list_id: i64) -> Result<Vec<Task>> {
        self.tick().list_tasks(list_id)
    }

    fn create_task(
        &self,
        list_id: i64,
        user_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task> {
        self.tick().create_task(list_id, user_id, description, due_date)
    }

    fn update_task_description(&self, task_id: i64, description: &str) -> Result<()> {
        self.tick().update_task_description(task_id, description)
    }

    fn update_task_status(&self, task_id: i64, status: Status) -> Result<()> {
        self.tick().update_task_status(task_id, status)
    }

    fn update_task_due_date(&self, task_id: i64, due_date: Option<DateTime<Utc>>) -> Result<()> {
        self.tick().update_task_due_date(task_id, due_date)
    }
}

/// Like the inner store, except `create_list` always reports the backend
/// as unreachable.
pub struct FailingListStorage<S> {
    inner: S,
}

impl<S: Storage> FailingListStorage<S> {
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Storage> Storage for FailingListStorage<S> {
    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    fn get_credential_hash_by_name(&self, name: &str) -> Result<Option<String>> {
        self.inner.get_credential_hash_by_name(name)
    }

    fn create_user(&self, name: &str, credential_hash: &str) -> Result<User> {
        self.inner.create_user(name, credential_hash)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        self.inner.get_user_by_name(name)
    }

    fn get_user(&self, user_id: i64) -> Result<Option<User>> {
        self.inner.get_user(user_id)
    }

    fn create_list(&self, _owner_user_id: i64, _description: &str) -> Result<ListRecord> {
        Err(TodoError::StorageUnavailable {
            backend: "sqlite",
            reason: "injected failure".to_string(),
        })
    }

    fn get_list(&self, list_id: i64) -> Result<Option<ListRecord>> {
        self.inner.get_list(list_id)
    }

    fn list_lists_for_user(&self, user_id: i64) -> Result<Vec<ListRecord>> {
        self.inner.list_lists_for_user(user_id)
    }

    fn set_default_list(&self, user_id: i64, list_id: i64) -> Result<()> {
        self.inner.set_default_list(user_id, list_id)
    }

    fn list_tasks(&self, list_id: i64) -> Result<Vec<Task>> {
        self.inner.list_tasks(list_id)
    }

    fn create_task(
        &self,
        list_id: i64,
        user_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task> {
        self.inner.create_task(list_id, user_id, description, due_date)
    }

    fn update_task_description(&self, task_id: i64, description: &str) -> Result<()> {
        self.inner.update_task_description(task_id, description)
    }

    fn update_task_status(&self, task_id: i64, status: Status) -> Result<()> {
        self.inner.update_task_status(task_id, status)
    }

    fn update_task_due_date(&self, task_id: i64, due_date: Option<DateTime<Utc>>) -> Result<()> {
        self.inner.update_task_due_date(task_id, due_date)
    }
}
