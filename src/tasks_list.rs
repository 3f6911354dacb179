//! The in-memory task list.
//!
//! A [`TasksList`] mirrors one row of `lists` plus its tasks. Every mutator
//! performs exactly one storage call and only touches the in-memory copy once
//! that call has succeeded, so memory never runs ahead of the store.
//!
//! Tasks are addressed by their stable `db_id`. Display positions are only
//! meaningful for the snapshot they were rendered from; use
//! [`TasksList::id_at`] to translate one into an id.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Result, TodoError};
use crate::model::{ListRecord, Status, Task};
use crate::storage::Storage;
use crate::util::time;

pub struct TasksList<'a> {
    storage: &'a dyn Storage,
    record: ListRecord,
    tasks: Vec<Task>,
}

impl fmt::Debug for TasksList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TasksList")
            .field("backend", &self.storage.backend_name())
            .field("record", &self.record)
            .field("tasks", &self.tasks)
            .finish()
    }
}

impl<'a> TasksList<'a> {
    pub(crate) fn new(storage: &'a dyn Storage, record: ListRecord, tasks: Vec<Task>) -> Self {
        Self {
            storage,
            record,
            tasks,
        }
    }

    #[must_use]
    pub const fn db_id(&self) -> i64 {
        self.record.db_id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.record.description
    }

    #[must_use]
    pub const fn owner_user_id(&self) -> i64 {
        self.record.owner_user_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Task at a 0-based display position.
    #[must_use]
    pub fn task_at(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    /// Id of the task at a 0-based display position.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if the position is out of range.
    pub fn id_at(&self, index: usize) -> Result<i64> {
        self.task_at(index).map(|task| task.db_id).ok_or_else(|| {
            TodoError::validation(
                "task",
                format!(
                    "position {} is out of range (list has {} tasks)",
                    index + 1,
                    self.tasks.len()
                ),
            )
        })
    }

    /// Create a task in this list.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for an empty description (nothing is persisted),
    /// or the storage error.
    pub fn add_task(&mut self, description: &str, due_date: Option<DateTime<Utc>>) -> Result<Task> {
        let description = require_description(description)?;
        let task = self.storage.create_task(
            self.record.db_id,
            self.record.owner_user_id,
            description,
            due_date,
        )?;
        debug!(list_id = self.record.db_id, task_id = task.db_id, "Added task");
        self.tasks.push(task.clone());
        Ok(task)
    }

    /// # Errors
    ///
    /// Returns `Validation` for an empty description, `NotFound` if the task
    /// is not in this list, or the storage error.
    pub fn edit_task_description(&mut self, task_id: i64, new_description: &str) -> Result<()> {
        let description = require_description(new_description)?;
        let position = self.position(task_id)?;
        self.storage.update_task_description(task_id, description)?;
        self.tasks[position].description = description.to_string();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the task is not in this list, or the storage
    /// error.
    pub fn set_task_status(&mut self, task_id: i64, status: Status) -> Result<()> {
        let position = self.position(task_id)?;
        self.storage.update_task_status(task_id, status)?;
        self.tasks[position].status = status;
        Ok(())
    }

    /// Set a due date. Any timestamp is accepted, past ones included.
    ///
    /// Due dates are kept to whole seconds: sub-second precision in
    /// `new_date` is dropped, both here and in storage.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the task is not in this list, or the storage
    /// error.
    pub fn set_due_date(&mut self, task_id: i64, new_date: DateTime<Utc>) -> Result<()> {
        self.write_due_date(task_id, Some(time::normalize(new_date)))
    }

    /// # Errors
    ///
    /// Returns `NotFound` if the task is not in this list, or the storage
    /// error.
    pub fn clear_due_date(&mut self, task_id: i64) -> Result<()> {
        self.write_due_date(task_id, None)
    }

    /// Tasks with the given status, or all tasks for `None`, in list order.
    ///
    /// The iterator is lazy and cheap to clone; calling this again yields the
    /// same sequence until the list is mutated.
    pub fn filter_tasks_by_status(
        &self,
        status: Option<Status>,
    ) -> impl Iterator<Item = &Task> + Clone {
        self.tasks
            .iter()
            .filter(move |task| status.is_none_or(|wanted| task.status == wanted))
    }

    /// Re-read the tasks from storage.
    ///
    /// # Errors
    ///
    /// Returns the storage error; the in-memory tasks are kept on failure.
    pub fn reload(&mut self) -> Result<()> {
        self.tasks = self.storage.list_tasks(self.record.db_id)?;
        Ok(())
    }

    fn write_due_date(&mut self, task_id: i64, due_date: Option<DateTime<Utc>>) -> Result<()> {
        let position = self.position(task_id)?;
        self.storage.update_task_due_date(task_id, due_date)?;
        self.tasks[position].due_date = due_date;
        Ok(())
    }

    fn position(&self, task_id: i64) -> Result<usize> {
        self.tasks
            .iter()
            .position(|task| task.db_id == task_id)
            .ok_or_else(|| TodoError::not_found("task", task_id))
    }
}

fn require_description(description: &str) -> Result<&str> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(TodoError::validation(
            "description",
            "task description cannot be empty",
        ));
    }
    Ok(trimmed)
}
