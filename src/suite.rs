//! Explicit construction of the resolution and publication suites.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::corpus::Loader;
use crate::diagnostics::Reporter;
use crate::error::Error;
use crate::external::ExternalRegistry;
use crate::index::CorpusIndex;
use crate::processors::Processor;
use crate::resolver::Engine;
use crate::types::ObjectKind;

/// The two indexes of one processing pass.
///
/// `resolution` is the unfiltered load: links resolve against it because the
/// filter removes the indirections that alias-following needs. `publication`
/// is the filtered load: only objects in it are rendered.
#[derive(Debug, Default)]
pub struct Suites {
    /// Filtered, processed corpus.
    pub publication: CorpusIndex,
    /// Unfiltered corpus.
    pub resolution: CorpusIndex,
}

impl Suites {
    /// Build both suites from two independent loads. The resolution suite is
    /// indexed before the pipeline runs so docstring stages can resolve
    /// against it. Call again on every rerun; nothing is reused.
    ///
    /// # Errors
    ///
    /// Returns loader errors.
    pub fn build(
        loader: &dyn Loader,
        processors: &[Box<dyn Processor>],
        external: &dyn ExternalRegistry,
        reporter: &dyn Reporter,
        scheme: &str,
    ) -> Result<Self, Error> {
        let resolution = CorpusIndex::from_modules(&loader.load()?);

        let mut modules = loader.load()?;
        let engine = Engine::new(&resolution, external, reporter, scheme);
        for processor in processors {
            processor.process(&mut modules, &engine);
        }
        let publication = CorpusIndex::from_modules(&modules);

        info!(
            "built suites: {} objects for resolution, {} published",
            resolution.corpus().len(),
            publication.corpus().len()
        );
        return Ok(Self {
            publication,
            resolution,
        });
    }

    /// Directories holding module sources and `extra` files (such as corpus
    /// files), relative to `root`, keeping only those not inside another one.
    pub fn watch_roots(&self, root: &Path, extra: &[PathBuf]) -> Vec<PathBuf> {
        let module_files = self
            .resolution
            .corpus()
            .iter()
            .filter(|object| return object.kind == ObjectKind::Module)
            .filter_map(|object| return object.location.as_ref())
            .map(|location| return location.filename.as_path());

        let dirs: BTreeSet<PathBuf> = module_files
            .chain(extra.iter().map(PathBuf::as_path))
            .filter_map(|file| return root.join(file).parent().map(Path::to_path_buf))
            .collect();

        return dirs
            .iter()
            .filter(|dir| return !dirs.iter().any(|other| return other != *dir && dir.starts_with(other)))
            .cloned()
            .collect();
    }
}
