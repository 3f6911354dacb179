//! Small helpers shared by the storage adapters and the shell.

pub mod time;
