//! Command-line interface.
//!
//! Running `todoika` without a subcommand starts the interactive session.

pub mod prompt;
pub mod render;
pub mod shell;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use std::io;
use std::path::PathBuf;

pub use prompt::Prompter;
pub use shell::Shell;

#[derive(Parser, Debug)]
#[command(name = "todoika", version, about = "Personal task lists in your terminal")]
pub struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, env = "TODOIKA_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Also write JSON logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the database tables on the configured backend
    Init,
    /// Print a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

/// Write a completion script for `shell` to stdout.
pub fn print_completions(shell: CompletionShell) {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut io::stdout());
}
