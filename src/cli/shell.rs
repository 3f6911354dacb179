//! Interactive session: login/register, then the task menu.
//!
//! The shell owns no data. It turns answers into calls on [`TasksList`] and
//! the builders, prints what comes back, and keeps going when a single
//! command fails.

use std::io::{self, BufRead, Write};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::auth::{CredentialHasher, authenticate};
use crate::builder::{TasksListBuilder, UserBuilder};
use crate::cli::prompt::Prompter;
use crate::cli::render::task_line;
use crate::error::{Result, TodoError};
use crate::model::{Status, User};
use crate::storage::Storage;
use crate::tasks_list::TasksList;
use crate::util::time::{INPUT_HINT, parse_due_date};

const QUIT: usize = 10;

enum Flow {
    Continue,
    Quit,
}

pub struct Shell<'a, R, W> {
    storage: &'a dyn Storage,
    hasher: &'a dyn CredentialHasher,
    prompter: Prompter<R, W>,
    user: Option<User>,
    current: Option<TasksList<'a>>,
}

impl<'a, R: BufRead, W: Write> Shell<'a, R, W> {
    pub fn new(
        storage: &'a dyn Storage,
        hasher: &'a dyn CredentialHasher,
        prompter: Prompter<R, W>,
    ) -> Self {
        Self {
            storage,
            hasher,
            prompter,
            user: None,
            current: None,
        }
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub const fn current_list(&self) -> Option<&TasksList<'a>> {
        self.current.as_ref()
    }

    pub fn into_output(self) -> W {
        self.prompter.into_output()
    }

    /// Run until the user quits or input ends.
    ///
    /// A failing command is reported and the loop continues.
    ///
    /// # Errors
    ///
    /// Returns an error only if the output can no longer be written.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.step() {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => return Ok(()),
                Err(TodoError::Io(err)) if err.kind() == io::ErrorKind::UnexpectedEof => {
                    debug!("Input closed, ending session");
                    return Ok(());
                }
                Err(TodoError::Io(err)) if err.kind() == io::ErrorKind::Interrupted => {
                    self.prompter.say("\nCommand cancelled")?;
                }
                Err(err) => {
                    debug!(code = err.code().as_str(), "Command failed: {err}");
                    self.prompter.say(&err.to_string())?;
                }
            }
        }
    }

    fn step(&mut self) -> Result<Flow> {
        if self.current.is_none() {
            return self.welcome();
        }

        match self.main_menu()? {
            1 => self.create_task()?,
            2 => self.edit_description()?,
            3 => self.edit_status()?,
            4 => self.edit_due_date()?,
            5 => self.show_with_status(Some(Status::New))?,
            6 => self.show_with_status(None)?,
            7 => self.show_with_status(Some(Status::Done))?,
            8 => self.switch_list()?,
            9 => self.create_list()?,
            _ => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn welcome(&mut self) -> Result<Flow> {
        match self
            .prompter
            .ask_choice("Login (1) or Register (2) or Quit (3)", 1..=3)?
        {
            1 => self.login()?,
            2 => self.register()?,
            _ => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn login(&mut self) -> Result<()> {
        let name = self.prompter.ask("Enter your name")?;
        let password = self.prompter.ask_password("Enter your password")?;

        match authenticate(self.storage, self.hasher, name.trim(), &password) {
            Ok(user) => self.enter(user),
            Err(TodoError::Authentication) => {
                self.prompter.say("Wrong username or password")?;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn register(&mut self) -> Result<()> {
        let name = self.prompter.ask("Enter your name")?;
        let password = self.prompter.ask_password("Enter your password")?;
        if password.is_empty() {
            return Err(TodoError::validation("password", "password cannot be empty"));
        }

        let hash = self.hasher.hash(&password)?;
        let user = UserBuilder::new(self.storage).build_new(&name, &hash)?;
        self.enter(user)
    }

    fn enter(&mut self, user: User) -> Result<()> {
        let list = TasksListBuilder::new(self.storage).build_default(&user)?;
        self.prompter.say(&format!(
            "Hello, {}! You are in list '{}'.",
            user.name,
            list.description()
        ))?;
        self.user = Some(user);
        self.current = Some(list);
        Ok(())
    }

    fn main_menu(&mut self) -> Result<usize> {
        let (title, count) = self
            .current
            .as_ref()
            .map(|list| (list.description().to_string(), list.len()))
            .unwrap_or_default();

        let menu = [
            format!("Commands ({title}):"),
            "1: add new task".to_string(),
            "2: edit description".to_string(),
            "3: edit status".to_string(),
            "4: edit due date".to_string(),
            "5: show active tasks".to_string(),
            format!("6: show all tasks ({count})"),
            "7: show completed tasks".to_string(),
            "8: switch list".to_string(),
            "9: create list".to_string(),
            format!("{QUIT}: quit"),
        ]
        .join("\n");
        self.prompter.say(&menu)?;
        self.prompter.ask_choice("Command", 1..=QUIT)
    }

    fn create_task(&mut self) -> Result<()> {
        let description = self.prompter.ask("Task description")?;
        let due_date = if self.prompter.confirm("Add due date?", false)? {
            Some(self.ask_date("Set due date")?)
        } else {
            None
        };
        current_mut(&mut self.current)?.add_task(&description, due_date)?;
        Ok(())
    }

    fn edit_description(&mut self) -> Result<()> {
        let Some(task_id) = self.pick_task()? else {
            return Ok(());
        };
        let description = self.prompter.ask("New description")?;
        current_mut(&mut self.current)?.edit_task_description(task_id, &description)
    }

    fn edit_status(&mut self) -> Result<()> {
        let Some(task_id) = self.pick_task()? else {
            return Ok(());
        };
        let status = match self
            .prompter
            .ask_choice("You can choose 1 - DONE or 2 - NEW status", 1..=2)?
        {
            1 => Status::Done,
            _ => Status::New,
        };
        current_mut(&mut self.current)?.set_task_status(task_id, status)
    }

    fn edit_due_date(&mut self) -> Result<()> {
        let Some(task_id) = self.pick_task()? else {
            return Ok(());
        };
        let due_date = self.ask_date("Set new date")?;
        current_mut(&mut self.current)?.set_due_date(task_id, due_date)
    }

    fn show_with_status(&mut self, status: Option<Status>) -> Result<()> {
        let list = self.current.as_ref().ok_or_else(no_current_list)?;
        let color = self.prompter.use_color();

        let mut shown = 0;
        for task in list.filter_tasks_by_status(status) {
            self.prompter.say(&task_line(None, task, color))?;
            shown += 1;
        }
        if shown == 0 {
            self.prompter.say("No tasks")?;
        }
        Ok(())
    }

    /// Show numbered tasks and translate the picked position into an id.
    fn pick_task(&mut self) -> Result<Option<i64>> {
        let list = self.current.as_ref().ok_or_else(no_current_list)?;
        if list.is_empty() {
            self.prompter.say("No tasks yet")?;
            return Ok(None);
        }

        let color = self.prompter.use_color();
        for (i, task) in list.filter_tasks_by_status(None).enumerate() {
            self.prompter.say(&task_line(Some(i + 1), task, color))?;
        }
        let position = self.prompter.ask_choice("Pick a task", 1..=list.len())?;
        list.id_at(position - 1).map(Some)
    }

    fn switch_list(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let builder = TasksListBuilder::new(self.storage);
        let lists = builder.lists_for(user_id)?;
        if lists.is_empty() {
            self.prompter.say("No lists")?;
            return Ok(());
        }

        let current_id = self.current.as_ref().map(TasksList::db_id);
        for (i, list) in lists.iter().enumerate() {
            let marker = if Some(list.db_id) == current_id { '*' } else { ' ' };
            self.prompter
                .say(&format!("{marker} {} - {}", i + 1, list.description))?;
        }
        let position = self.prompter.ask_choice("Pick a list", 1..=lists.len())?;
        self.current = Some(builder.build(user_id, lists[position - 1].db_id)?);
        Ok(())
    }

    fn create_list(&mut self) -> Result<()> {
        let user_id = self.user_id()?;
        let description = self.prompter.ask("List description")?;
        let list = TasksListBuilder::new(self.storage).create(user_id, &description)?;

        if self.prompter.confirm("Make it your default list?", false)? {
            self.storage.set_default_list(user_id, list.db_id())?;
            if let Some(user) = self.user.as_mut() {
                user.default_list_id = Some(list.db_id());
            }
        }
        self.current = Some(list);
        Ok(())
    }

    fn ask_date(&mut self, prompt: &str) -> Result<DateTime<Utc>> {
        let input = self.prompter.ask(&format!("{prompt} ({INPUT_HINT})"))?;
        parse_due_date(&input)
    }

    fn user_id(&self) -> Result<i64> {
        self.user
            .as_ref()
            .map(|user| user.db_id)
            .ok_or(TodoError::Authentication)
    }
}

fn current_mut<'s, 'a>(
    current: &'s mut Option<TasksList<'a>>,
) -> Result<&'s mut TasksList<'a>> {
    current.as_mut().ok_or_else(no_current_list)
}

fn no_current_list() -> TodoError {
    TodoError::not_found("list", "current")
}
