//! todoika - personal task lists in the terminal.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};

use todoika::Result;
use todoika::auth::Argon2Hasher;
use todoika::cli::{self, Cli, Commands, Prompter, Shell};
use todoika::config;
use todoika::logging::init_logging;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref()) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.code().exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Some(Commands::Completions { shell }) => {
            cli::print_completions(*shell);
            Ok(())
        }
        Some(Commands::Init) => {
            let backend = config::load_backend(cli.config.as_deref())?;
            let storage = config::provision_storage(&backend)?;
            info!(backend = storage.backend_name(), "Schema provisioned");
            println!("Initialized {} storage", storage.backend_name());
            Ok(())
        }
        None => interactive(cli),
    }
}

fn interactive(cli: &Cli) -> Result<()> {
    let backend = config::load_backend(cli.config.as_deref())?;
    let storage = config::open_storage(&backend)?;
    debug!(backend = storage.backend_name(), "Storage opened");

    let hasher = Argon2Hasher::default();
    let stdin = io::stdin();
    let stdout = io::stdout();
    let interactive = stdin.is_terminal() && stdout.is_terminal();
    let prompter = Prompter::new(stdin.lock(), stdout.lock())
        .raw_terminal(interactive)
        .color(interactive);

    Shell::new(storage.as_ref(), &hasher, prompter).run()
}
