//! Tabula CLI - Main entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tabula_cli::commands;
use tabula_cli::config::Config;
use tabula_cli::error::CliError;
use tabula_cli::output;

/// Tabula - column-set migrations for live PostgreSQL tables
#[derive(Parser, Debug)]
#[command(name = "tabula")]
#[command(author, version, about = "Column-set migrations for live PostgreSQL tables", long_about = None)]
struct Cli {
    /// Path to config file (default: tabula.toml)
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log every executed statement and transaction step
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List tables on the search path
    Tables,

    /// Show a table's columns and constraints
    Inspect {
        table: String,

        /// Print the column set as JSON, ready to edit and pass to `alter`
        #[arg(long)]
        json: bool,
    },

    /// Migrate a table to the column set in a JSON file
    Alter {
        table: String,

        /// JSON file holding the desired column set
        #[arg(long, value_name = "FILE")]
        desired: PathBuf,

        /// New table name
        #[arg(long, value_name = "NEW")]
        rename: Option<String>,

        /// Print planned SQL without executing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage enum types
    #[command(subcommand)]
    Enum(EnumCommand),
}

#[derive(Subcommand, Debug)]
enum EnumCommand {
    /// List enums and their labels
    List,

    /// Print the labels of one enum in order
    Values { name: String },

    /// Create an enum type
    Create {
        name: String,

        #[arg(required = true)]
        labels: Vec<String>,
    },

    /// Drop an enum type
    Drop {
        name: String,

        /// Also drop columns that use the enum
        #[arg(long)]
        cascade: bool,
    },

    /// Show column values an enum cannot hold
    Incompatible {
        table: String,
        column: String,
        enum_name: String,
    },

    /// Convert a text column to an enum column
    Swap {
        table: String,
        column: String,
        enum_name: String,

        /// Label that replaces values outside the enum
        #[arg(long)]
        substitute: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tabula_migrations=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", output::err_line(&e.to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match cli.config.as_deref() {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Command::Tables => commands::tables::run(&config),
        Command::Inspect { table, json } => commands::inspect::run(&config, &table, json),
        Command::Alter {
            table,
            desired,
            rename,
            dry_run,
        } => commands::alter::run(&config, &table, &desired, rename.as_deref(), dry_run),
        Command::Enum(cmd) => match cmd {
            EnumCommand::List => commands::enums::list(&config),
            EnumCommand::Values { name } => commands::enums::values(&config, &name),
            EnumCommand::Create { name, labels } => {
                commands::enums::create(&config, &name, &labels)
            }
            EnumCommand::Drop { name, cascade } => {
                commands::enums::drop(&config, &name, cascade)
            }
            EnumCommand::Incompatible {
                table,
                column,
                enum_name,
            } => commands::enums::incompatible(&config, &table, &column, &enum_name),
            EnumCommand::Swap {
                table,
                column,
                enum_name,
                substitute,
            } => commands::enums::swap(&config, &table, &column, &enum_name, substitute.as_deref()),
        },
    }
}
