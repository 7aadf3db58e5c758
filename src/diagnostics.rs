use std::cell::RefCell;
use std::fmt::Write as _;
use std::path::PathBuf;

use crate::error::Error;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

/// Non-fatal reference problems. A build always completes; these are surfaced
/// for a human to fix later.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// More than one candidate matched; the first was used.
    #[error("ambiguous name `{name}`, using the first of: {}", candidates.join(", "))]
    AmbiguousMatch {
        /// Candidate descriptions in the order they were found.
        candidates: Vec<String>,
        /// The name being resolved.
        name: String,
    },

    /// A render tag matched several published objects; the first was rendered.
    #[error("render target `{fqn}` matched {count} objects in {}, rendering the first", document.display())]
    AmbiguousRenderTarget {
        /// Number of matches.
        count: usize,
        /// Document containing the tag.
        document: PathBuf,
        /// FQN named by the tag.
        fqn: String,
    },

    /// An indirection chain looped back on itself or ran too long.
    #[error("indirection cycle: {}", chain.join(" -> "))]
    IndirectionCycle {
        /// Names visited, ending with the one that closed the loop.
        chain: Vec<String>,
    },

    /// A render tag names nothing in the publication suite; the tag was removed.
    #[error("render target `{fqn}` not found in {}", document.display())]
    MissingRenderTarget {
        /// Document containing the tag.
        document: PathBuf,
        /// FQN named by the tag.
        fqn: String,
    },

    /// A scope tag names nothing in the resolution suite; the tag was removed.
    #[error("scope target `{name}` not found in {}", document.display())]
    MissingScopeTarget {
        /// Document containing the tag.
        document: PathBuf,
        /// Name given to the scope tag.
        name: String,
    },

    /// An explicit link tag could not be resolved and was rendered as code.
    #[error("unresolved link `{name}` in {}", document.display())]
    UnresolvedReference {
        /// Document containing the tag.
        document: PathBuf,
        /// Name given to the link tag.
        name: String,
    },
}

/// Receives warnings. Injected into the resolution engine and the
/// preprocessor; scoped to one build invocation.
pub trait Reporter {
    /// Record one warning.
    fn report(&self, warning: Warning);
}

/// Reporter that keeps every warning and logs it through `tracing`.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: RefCell<Vec<Warning>>,
}

impl Diagnostics {
    /// Number of warnings recorded so far.
    pub fn count(&self) -> usize {
        return self.warnings.borrow().len();
    }

    /// Consume the reporter, returning warnings in the order reported.
    pub fn into_warnings(self) -> Vec<Warning> {
        return self.warnings.into_inner();
    }
}

impl Reporter for Diagnostics {
    fn report(&self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.borrow_mut().push(warning);
    }
}

/// Render an error as valid markdown with bold headings and print to stderr.
pub fn print_error(e: &Error) {
    let md = render_error(e);
    for line in md.lines() {
        if line.starts_with('#') {
            eprintln!("{BOLD}{line}{RESET}");
        } else {
            eprintln!("{line}");
        }
    }
}

/// Render an error as a structured markdown diagnostic: what happened, and
/// how to fix it where there is an obvious fix.
pub fn render_error(e: &Error) -> String {
    match e {
        Error::CorpusNotFound { path } => format!("\
# Error: Corpus Not Found

`{}` does not exist.

## Fix

Generate the API corpus first, or point `corpus` in `.doclink.toml` at it:

    corpus = [\"build/api.json\"]
", path.display()),

        Error::CorpusParse { path, reason } => format!("\
# Error: Corpus Parse Failed

Could not parse `{}`: {reason}

## Fix

The corpus must be a JSON array of module objects, each with `kind` and `name`.
", path.display()),

        Error::CorpusInvalid { path, reason } => format!("\
# Error: Corpus Invalid

`{}`: {reason}
", path.display()),

        Error::InvalidPattern { pattern, reason } => format!("\
# Error: Invalid Pattern

`{pattern}`: {reason}

## Fix

Tag names in `[tags]` must be identifiers such as `pydoc`, and `link` is reserved.
"),

        Error::TomlDe(e) => format!("\
# Error: Invalid TOML

{e}

## Fix

Check `.doclink.toml`.
"),

        Error::Watch { reason } => format!("\
# Error: Watch Failed

{reason}
"),

        Error::Io(e) => format!("\
# Error: I/O

{e}
"),

        Error::Json(e) => format!("\
# Error: JSON

{e}
"),
    }
}

/// Render recorded warnings as a markdown summary, or an empty string if none.
pub fn render_warnings(warnings: &[Warning]) -> String {
    if warnings.is_empty() {
        return String::new();
    }

    let mut out = format!("# Warnings ({})\n\n", warnings.len());
    for warning in warnings {
        let _ = writeln!(out, "- {warning}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_keep_report_order() {
        let diagnostics = Diagnostics::default();
        diagnostics.report(Warning::IndirectionCycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        });
        diagnostics.report(Warning::MissingScopeTarget {
            document: PathBuf::from("guide.md"),
            name: "pkg.gone".into(),
        });

        assert_eq!(diagnostics.count(), 2);
        let warnings = diagnostics.into_warnings();
        assert!(matches!(warnings[0], Warning::IndirectionCycle { .. }));
        assert_eq!(warnings[1].to_string(), "scope target `pkg.gone` not found in guide.md");
    }

    #[test]
    fn warning_summary_lists_each_warning() {
        let summary = render_warnings(&[Warning::AmbiguousMatch {
            candidates: vec!["class pkg.X".into(), "function pkg.X".into()],
            name: "pkg.X".into(),
        }]);
        assert!(summary.starts_with("# Warnings (1)"));
        assert!(summary.contains("using the first of: class pkg.X, function pkg.X"));
        assert_eq!(render_warnings(&[]), "");
    }

    #[test]
    fn corpus_not_found_suggests_config() {
        let md = render_error(&Error::CorpusNotFound {
            path: PathBuf::from("build/api.json"),
        });
        assert!(md.starts_with("# Error: Corpus Not Found"));
        assert!(md.contains("`build/api.json` does not exist."));
    }
}
