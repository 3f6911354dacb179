//! Domain records shared by the storage adapters and the builders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TodoError;

/// Task status. Both transitions are always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    #[default]
    New,
    Done,
}

impl Status {
    /// Value stored in the `tasks.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Done => "DONE",
        }
    }

    /// Checkbox glyph used when rendering a task.
    #[must_use]
    pub const fn glyph(self) -> char {
        match self {
            Self::New => '☐',
            Self::Done => '☑',
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TodoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEW" => Ok(Self::New),
            "DONE" => Ok(Self::Done),
            other => Err(TodoError::validation(
                "status",
                format!("unknown status '{other}' (expected NEW or DONE)"),
            )),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub db_id: i64,
    pub name: String,
    /// Opaque credential hash (PHC string for the Argon2 scheme).
    pub password_hash: String,
    pub default_list_id: Option<i64>,
}

/// A row of the `lists` table, without its tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListRecord {
    pub db_id: i64,
    pub description: String,
    pub owner_user_id: i64,
}

/// A single task. Timestamps carry whole-second precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub db_id: i64,
    pub description: String,
    pub status: Status,
    pub created: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub list_id: i64,
    pub user_id: i64,
}
