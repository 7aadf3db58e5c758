mod commands;
mod config;
mod context;
mod corpus;
mod diagnostics;
mod error;
mod external;
mod index;
mod preprocessor;
mod processors;
mod render;
mod resolver;
mod scanner;
mod scope;
mod suite;
mod tags;
mod types;
mod watch;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::OutputFormat;

#[derive(Parser)]
#[command(name = "doclink", about = "Cross-reference resolution for API documentation in markdown")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Log at debug level (`RUST_LOG` still applies)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite every markdown file under the docs directory into the output directory
    Build {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Exit 1 when any warning was recorded
        #[arg(long)]
        strict: bool,
    },
    /// Show what a single name resolves to
    Resolve {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Name as it would appear in a backtick span or link tag
        name: String,
        /// FQN of the object to resolve relative to
        #[arg(long)]
        scope: Option<String>,
    },
    /// Build, then rebuild whenever docs or API sources change
    Watch,
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays machine readable.
fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("warning: logging unavailable: {e}");
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Build { format, strict } => commands::build(strict, format),
        Commands::Resolve { format, name, scope } => commands::resolve(&name, scope.as_deref(), format),
        Commands::Watch => watch::run(),
    };

    return match result {
        Ok(code) => code,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::from(2)
        },
    };
}
