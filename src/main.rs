//! Shelf CLI entry point.

use clap::Parser;
use shelf::cli::commands;
use shelf::cli::{Cli, Commands};
use shelf::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR non-TTY stdout
    let json = cli.json || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    // Run the command and handle errors
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
    let root = cli.root.as_ref();

    match &cli.command {
        Commands::Init => commands::init::execute(db, root, cli.dry_run, json),
        Commands::Version => commands::version::execute(json),

        // Index maintenance
        Commands::Sync(args) => commands::sync::execute(args, db, root, cli.dry_run, json),
        Commands::Prune { kind } => {
            commands::prune::execute(kind.as_deref(), db, root, cli.dry_run, json)
        }
        Commands::Status { kind } => commands::status::execute(kind.as_deref(), db, root, json),

        // Items
        Commands::List(args) => commands::list::execute(args, db, root, json),
        Commands::Get { kind, slug } => commands::get::execute(kind, slug, db, root, json),
        Commands::Create(args) => commands::create::execute(args, db, root, cli.dry_run, json),
        Commands::Set {
            kind,
            slug,
            field,
            values,
        } => commands::set::execute(kind, slug, field, values, db, root, cli.dry_run, json),
        Commands::Unset {
            kind,
            slug,
            field,
            value,
        } => commands::set::execute_unset(
            kind,
            slug,
            field,
            value.as_deref(),
            db,
            root,
            cli.dry_run,
            json,
        ),

        // Schema
        Commands::Validate { kind, slugs } => {
            commands::validate::execute(kind.as_deref(), slugs, db, root, json)
        }
        Commands::Fields { kind } => commands::fields::execute(kind, json),

        // Shell completions
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}
