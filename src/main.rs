//! rmsync CLI entry point.

use clap::Parser;
use rmsync::cli::commands;
use rmsync::cli::{Cli, Commands};
use rmsync::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    init_tracing(cli.verbose, cli.quiet);

    // --json or non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info,reqwest=info,hyper=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    match &cli.command {
        Commands::Version => commands::version::execute(json),
        Commands::Status => commands::status::execute(db, json),
        Commands::List { all } => commands::list::execute(db, *all, json),
        Commands::Backup { ids, all } => commands::transfer::execute_backup(db, ids, *all, json),
        Commands::Sync { ids, all } => commands::transfer::execute_sync(db, ids, *all, json),
        Commands::Target { command } => commands::target::execute(command, db, json),
        Commands::History { id, limit } => commands::history::execute(id, *limit, db, json),
        Commands::Decode { files } => commands::decode::execute(files, json),
        Commands::Strokes { id, language } => {
            commands::strokes::execute(id, language.as_deref(), db, json)
        }
        Commands::Upload { file, parent } => {
            commands::upload::execute(file, parent.as_deref(), db, json)
        }
        Commands::Config { command } => commands::config::execute(command, db, json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
