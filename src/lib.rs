//! `todoika` - personal task lists with pluggable storage
//!
//! Users register or log in, then add, edit, complete and filter tasks in
//! named lists. Everything is persisted through a [`storage::Storage`]
//! backend chosen by configuration.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface and the interactive shell
//! - [`builder`] - Constructs users and task lists from storage
//! - [`tasks_list`] - In-memory view of one list with write-through edits
//! - [`auth`] - Credential hashing and login
//! - [`storage`] - `SQLite` and `PostgreSQL` backends
//! - [`model`] - Data types (User, List, Task, Status)
//! - [`config`] - TOML configuration and backend selection
//! - [`error`] - Error types and exit codes
//! - [`util`] - Time helpers

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod builder;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod storage;
pub mod tasks_list;
pub mod util;

pub use error::{ErrorCode, Result, TodoError};
