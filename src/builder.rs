//! Builders that hydrate domain objects from storage.

use tracing::{debug, info};

use crate::error::{Result, TodoError};
use crate::model::{ListRecord, User};
use crate::storage::Storage;
use crate::storage::schema::DEFAULT_LIST_DESCRIPTION;
use crate::tasks_list::TasksList;

/// Loads and registers users.
#[derive(Clone, Copy)]
pub struct UserBuilder<'a> {
    storage: &'a dyn Storage,
}

impl<'a> UserBuilder<'a> {
    #[must_use]
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Hydrate a user by name. No side effects.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no such user exists.
    pub fn build_by_name(&self, name: &str) -> Result<User> {
        self.storage
            .get_user_by_name(name)?
            .ok_or_else(|| TodoError::not_found("user", name))
    }

    /// Register a user together with a default list.
    ///
    /// Runs three independent storage calls: create the user, create the
    /// default list, point the user at it. A failure after the first call
    /// leaves the user row without a default list; nothing is rolled back.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty name, `DuplicateName` if the name is
    /// taken, or whatever the later steps fail with.
    pub fn build_new(&self, name: &str, credential_hash: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TodoError::validation("name", "user name cannot be empty"));
        }

        let mut user = self.storage.create_user(name, credential_hash)?;
        let list = self
            .storage
            .create_list(user.db_id, DEFAULT_LIST_DESCRIPTION)?;
        self.storage.set_default_list(user.db_id, list.db_id)?;
        user.default_list_id = Some(list.db_id);

        info!(user_id = user.db_id, list_id = list.db_id, "Registered user");
        Ok(user)
    }
}

/// Loads and creates task lists for a user.
#[derive(Clone, Copy)]
pub struct TasksListBuilder<'a> {
    storage: &'a dyn Storage,
}

impl<'a> TasksListBuilder<'a> {
    #[must_use]
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Load a list and all of its tasks.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the list does not exist or belongs to another
    /// user.
    pub fn build(&self, user_id: i64, list_id: i64) -> Result<TasksList<'a>> {
        let record = self
            .storage
            .get_list(list_id)?
            .filter(|list| list.owner_user_id == user_id)
            .ok_or_else(|| TodoError::not_found("list", list_id))?;

        let tasks = self.storage.list_tasks(list_id)?;
        debug!(user_id, list_id, tasks = tasks.len(), "Built tasks list");
        Ok(TasksList::new(self.storage, record, tasks))
    }

    /// Load the user's default list.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user has no default list.
    pub fn build_default(&self, user: &User) -> Result<TasksList<'a>> {
        let list_id = user
            .default_list_id
            .ok_or_else(|| TodoError::not_found("default list for user", &user.name))?;
        self.build(user.db_id, list_id)
    }

    /// Create a new, empty list.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty description or `DuplicateList` if
    /// the user already has a list with that description.
    pub fn create(&self, user_id: i64, description: &str) -> Result<TasksList<'a>> {
        let description = description.trim();
        if description.is_empty() {
            return Err(TodoError::validation(
                "description",
                "list description cannot be empty",
            ));
        }

        let record = self.storage.create_list(user_id, description)?;
        info!(user_id, list_id = record.db_id, "Created list");
        Ok(TasksList::new(self.storage, record, Vec::new()))
    }

    /// All lists owned by the user, without their tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage query fails.
    pub fn lists_for(&self, user_id: i64) -> Result<Vec<ListRecord>> {
        self.storage.list_lists_for_user(user_id)
    }
}
