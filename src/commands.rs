//! CLI commands for doclink: build and resolve.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::BuildSession;
use crate::diagnostics::{self, Diagnostics, Warning};
use crate::error::Error;
use crate::preprocessor::Preprocessor;
use crate::resolver::Context;
use crate::scanner;
use crate::types::ResolvedLink;

/// How command results are printed on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

/// What one build produced.
#[derive(Debug, serde::Serialize)]
pub struct BuildSummary {
    /// Rendered fragments spliced in for render tags.
    pub fragments: usize,
    /// Non-fatal problems, in the order they were reported.
    pub warnings: Vec<Warning>,
    /// Output files written.
    pub written: Vec<PathBuf>,
}

/// Outcome of `resolve`, for JSON output.
#[derive(Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum Resolution<'a> {
    External {
        link: &'a str,
        name: &'a str,
        url: &'a str,
    },
    Internal {
        fqn: &'a str,
        link: &'a str,
        name: &'a str,
    },
    Unresolved {
        name: &'a str,
    },
}

/// Run one full build of the project at `root`: fresh suites, fresh scope
/// tables, every document rewritten and written out.
///
/// # Errors
///
/// Returns config, corpus, and I/O errors. Reference problems are collected
/// in the summary instead.
pub fn run_build(root: &Path) -> Result<(BuildSummary, BuildSession), Error> {
    let config = Config::load(root)?;
    let diagnostics = Diagnostics::default();
    let mut session = BuildSession::default();

    let written = {
        let preprocessor = Preprocessor::from_config(root, &config, &diagnostics)?;
        let mut documents = scanner::scan(root, &config)?;
        preprocessor.process_files(&mut documents, &mut session)?;
        info!("processed {} documents, {} warnings", documents.len(), diagnostics.count());
        scanner::write_outputs(&documents)?
    };

    for repeat in &session.repeats {
        debug!(
            "{} -> {}: {} bytes rendered",
            repeat.source.display(),
            repeat.output.display(),
            repeat.fragment.len()
        );
    }

    let summary = BuildSummary {
        fragments: session.repeats.len(),
        warnings: diagnostics.into_warnings(),
        written,
    };
    return Ok((summary, session));
}

/// Build the project in the current directory and print a summary.
///
/// # Errors
///
/// Returns errors from the build, or `Error::Json` if the summary cannot be serialized.
pub fn build(strict: bool, format: OutputFormat) -> Result<ExitCode, Error> {
    let (summary, _session) = run_build(Path::new("."))?;
    print_summary(&summary, format)?;

    if strict && !summary.warnings.is_empty() {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}

/// Print a build summary on stdout.
///
/// # Errors
///
/// Returns `Error::Json` if the summary cannot be serialized.
pub fn print_summary(summary: &BuildSummary, format: OutputFormat) -> Result<(), Error> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        OutputFormat::Text => {
            let count = summary.written.len();
            println!("Wrote {count} files ({} rendered fragments)", summary.fragments);
            let warnings = diagnostics::render_warnings(&summary.warnings);
            if !warnings.is_empty() {
                println!();
                print!("{warnings}");
            }
        },
    }
    return Ok(());
}

/// Resolve one name against the project's corpus and external registry.
/// Exit code is 1 when the name does not resolve.
///
/// # Errors
///
/// Returns config and corpus errors, or `Error::Json` if output cannot be serialized.
pub fn resolve(name: &str, scope: Option<&str>, format: OutputFormat) -> Result<ExitCode, Error> {
    let root = PathBuf::from(".");
    let config = Config::load(&root)?;
    let diagnostics = Diagnostics::default();
    let preprocessor = Preprocessor::from_config(&root, &config, &diagnostics)?;
    let suites = preprocessor.build_suites()?;

    let context = match scope {
        Some(fqn) => match suites.resolution.resolve_fqn(fqn).first() {
            Some(object) => Context::Object(object.id),
            None => {
                warn!("scope `{fqn}` not found, resolving globally");
                Context::Global
            },
        },
        None => Context::Global,
    };
    let resolved = preprocessor.engine(&suites).resolve(context, name);

    let report = match &resolved {
        ResolvedLink::External(external) => Resolution::External {
            link: &external.md_link,
            name,
            url: &external.url,
        },
        ResolvedLink::Internal { fqn, link } => Resolution::Internal { fqn, link, name },
        ResolvedLink::Unresolved => Resolution::Unresolved { name },
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => match report {
            Resolution::External { link, url, .. } => println!("EXTERNAL {url} {link}"),
            Resolution::Internal { fqn, link, .. } => println!("INTERNAL {fqn} {link}"),
            Resolution::Unresolved { name } => println!("UNRESOLVED {name}"),
        },
    }

    if resolved == ResolvedLink::Unresolved {
        return Ok(ExitCode::from(1));
    }
    return Ok(ExitCode::SUCCESS);
}
