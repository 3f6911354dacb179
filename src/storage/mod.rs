//! Storage layer for `todoika`.
//!
//! [`Storage`] is the persistence contract every backend implements. Callers
//! (builders, [`TasksList`](crate::tasks_list::TasksList), the shell) only
//! ever hold `&dyn Storage`, so backends are interchangeable.
//!
//! # Submodules
//!
//! - [`schema`] - DDL for both dialects and explicit provisioning
//! - [`sqlite`] - embedded single-file backend
//! - [`postgres`] - networked backend (feature `postgres`)
//!
//! Every mutating call commits before returning. No call spans more than one
//! logical operation.

pub mod schema;
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(test)]
pub(crate) mod contract;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{ListRecord, Status, Task, User};

pub use sqlite::SqliteStorage;

#[cfg(feature = "postgres")]
pub use postgres::{PostgresConfig, PostgresStorage};

/// Persistence operations required from a backend.
pub trait Storage {
    /// Short backend name used in logs and errors.
    fn backend_name(&self) -> &'static str;

    /// Stored credential hash for `name`, if the user exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn get_credential_hash_by_name(&self, name: &str) -> Result<Option<String>>;

    /// Insert a user with no default list.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateName` if `name` is taken.
    fn create_user(&self, name: &str, credential_hash: &str) -> Result<User>;

    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;

    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn get_user(&self, user_id: i64) -> Result<Option<User>>;

    /// Insert a list owned by `owner_user_id`.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateList` if the user already owns a list with this
    /// description.
    fn create_list(&self, owner_user_id: i64, description: &str) -> Result<ListRecord>;

    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn get_list(&self, list_id: i64) -> Result<Option<ListRecord>>;

    /// All lists owned by a user, in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn list_lists_for_user(&self, user_id: i64) -> Result<Vec<ListRecord>>;

    /// Point the user's default-list reference at `list_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` unless the user exists and owns the list.
    fn set_default_list(&self, user_id: i64, list_id: i64) -> Result<()>;

    /// Tasks of a list in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend query fails.
    fn list_tasks(&self, list_id: i64) -> Result<Vec<Task>>;

    /// Insert a task with status `NEW` and `created = now`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the list does not exist or is not owned by
    /// `user_id`; nothing is inserted then.
    fn create_task(
        &self,
        list_id: i64,
        user_id: i64,
        description: &str,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Task>;

    /// # Errors
    ///
    /// Returns `NotFound` if the task does not exist.
    fn update_task_description(&self, task_id: i64, description: &str) -> Result<()>;

    /// # Errors
    ///
    /// Returns `NotFound` if the task does not exist.
    fn update_task_status(&self, task_id: i64, status: Status) -> Result<()>;

    /// # Errors
    ///
    /// Returns `NotFound` if the task does not exist.
    fn update_task_due_date(&self, task_id: i64, due_date: Option<DateTime<Utc>>) -> Result<()>;
}
