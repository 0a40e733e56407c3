use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sqlgen::config::DEFAULT_CONFIG_FILE;
use sqlgen::{run_generation, GenerateOptions, SqlGenError};

#[derive(Parser)]
#[command(name = "sqlgen")]
#[command(author, version, about = "Schema-driven code generation for SQL Server databases")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate source files from the configured database schemas
    Generate {
        /// Path to the settings file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Only generate for this configured database
        #[arg(short, long)]
        database: Option<String>,

        /// Enable verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            config,
            database,
            verbose,
        } => {
            init_tracing(verbose);

            let options = GenerateOptions {
                config_path: config,
                database,
                verbose,
            };
            match run_generation(options) {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => {
                    report_error(&err, verbose);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn report_error(err: &anyhow::Error, verbose: bool) {
    eprintln!("Error: {err}");
    if matches!(
        err.downcast_ref::<SqlGenError>(),
        Some(SqlGenError::ConfigMissing { .. })
    ) {
        eprintln!();
        let _ = Cli::command().print_help();
    } else if verbose {
        for cause in err.chain().skip(1) {
            eprintln!("  caused by: {cause}");
        }
    }
}
