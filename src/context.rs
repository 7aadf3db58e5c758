//! The surrounding build's view of a processing pass.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Hooks the preprocessor uses to talk back to the build driving it.
pub trait BuildContext {
    /// Ask the build to watch `dir` for source changes. Idempotent.
    fn watch(&mut self, dir: &Path);

    /// Register `fragment` as a repeatable substitution for the document at
    /// `source` (written to `output`), returning the text to splice in.
    fn repeat(&mut self, source: &Path, output: &Path, fragment: String) -> String;
}

/// A registered repeatable substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeat {
    /// The substituted content.
    pub fragment: String,
    /// Output file the fragment lands in.
    pub output: PathBuf,
    /// Document containing the render tag.
    pub source: PathBuf,
}

/// Build context for one CLI build: collects watch directories and repeatable
/// substitutions. Discarded after the build.
#[derive(Debug, Default)]
pub struct BuildSession {
    /// Registered repeatable substitutions, in registration order.
    pub repeats: Vec<Repeat>,
    /// Directories to watch for source changes.
    pub watched: BTreeSet<PathBuf>,
}

impl BuildContext for BuildSession {
    fn watch(&mut self, dir: &Path) {
        if self.watched.insert(dir.to_path_buf()) {
            debug!("watching {}", dir.display());
        }
    }

    fn repeat(&mut self, source: &Path, output: &Path, fragment: String) -> String {
        self.repeats.push(Repeat {
            fragment: fragment.clone(),
            output: output.to_path_buf(),
            source: source.to_path_buf(),
        });
        return fragment;
    }
}
