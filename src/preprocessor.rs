//! Rewrites Markdown documents: render tags, scope tags, backtick spans and
//! link tags, in that order. Link tags go last so the code span an unresolved
//! one leaves behind is not resolved a second time.

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, info};

use crate::config::{Config, TagNames};
use crate::context::BuildContext;
use crate::corpus::{JsonLoader, Loader};
use crate::diagnostics::{Reporter, Warning};
use crate::error::Error;
use crate::external::{ExternalRegistry, StdlibRegistry};
use crate::processors::{DocstringBacktickProcessor, FilterProcessor, Processor};
use crate::render::{MarkdownRenderer, RenderOptions, Renderer};
use crate::resolver::{Context, Engine};
use crate::scope::{ScopeTable, ScopeTracker};
use crate::suite::Suites;
use crate::tags::{self, BacktickSpan, Tag};
use crate::types::Document;

/// Compiled patterns for the configured tag names.
struct TagPatterns {
    link: Regex,
    render: Regex,
    scope: Regex,
}

impl TagPatterns {
    /// Compile patterns for `names`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a tag name is not an identifier.
    fn compile(names: &TagNames) -> Result<Self, Error> {
        return Ok(Self {
            link: tags::inline_tag_pattern(&names.link)?,
            render: tags::block_tag_pattern(&names.render)?,
            scope: tags::block_tag_pattern(&names.scope)?,
        });
    }
}

/// The document-processing entry point. Holds collaborators only; every call
/// to [`Preprocessor::process_files`] builds its suites and scope tables from
/// scratch.
pub struct Preprocessor<'r> {
    external: Box<dyn ExternalRegistry>,
    loader: Box<dyn Loader>,
    names: TagNames,
    patterns: TagPatterns,
    processors: Vec<Box<dyn Processor>>,
    renderer: Box<dyn Renderer>,
    reporter: &'r dyn Reporter,
    root: PathBuf,
    scheme: String,
}

impl<'r> Preprocessor<'r> {
    /// Preprocessor with the default registry, pipeline and renderer.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a tag name is not an identifier.
    pub fn new(loader: Box<dyn Loader>, names: TagNames, scheme: &str, reporter: &'r dyn Reporter) -> Result<Self, Error> {
        let patterns = TagPatterns::compile(&names)?;
        let processors: Vec<Box<dyn Processor>> = vec![
            Box::new(FilterProcessor::default()),
            Box::new(DocstringBacktickProcessor::new(&names.link)?),
        ];
        return Ok(Self {
            external: Box::new(StdlibRegistry::default()),
            loader,
            names,
            patterns,
            processors,
            renderer: Box::new(MarkdownRenderer::new(scheme)),
            reporter,
            root: PathBuf::from("."),
            scheme: scheme.to_string(),
        });
    }

    /// Preprocessor for the project at `root` as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if a configured tag name is not an identifier.
    pub fn from_config(root: &Path, config: &Config, reporter: &'r dyn Reporter) -> Result<Self, Error> {
        let corpus = config.corpus.iter().map(|p| return root.join(p)).collect();
        let processors: Vec<Box<dyn Processor>> = vec![
            Box::new(config.filter.processor()),
            Box::new(DocstringBacktickProcessor::new(&config.tags.link)?),
        ];

        let preprocessor = Self::new(
            Box::new(JsonLoader::new(corpus)),
            config.tags.clone(),
            &config.link_scheme,
            reporter,
        )?
        .with_external(Box::new(config.external.registry()))
        .with_processors(processors)
        .with_root(root);
        return Ok(preprocessor);
    }

    /// Replace the external registry.
    #[must_use]
    pub fn with_external(mut self, external: Box<dyn ExternalRegistry>) -> Self {
        self.external = external;
        return self;
    }

    /// Replace the processing pipeline.
    #[must_use]
    pub fn with_processors(mut self, processors: Vec<Box<dyn Processor>>) -> Self {
        self.processors = processors;
        return self;
    }

    /// Project root that corpus and module source paths are relative to.
    #[must_use]
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = root.to_path_buf();
        return self;
    }

    /// Load and build both suites afresh.
    ///
    /// # Errors
    ///
    /// Returns loader errors.
    pub fn build_suites(&self) -> Result<Suites, Error> {
        return Suites::build(
            self.loader.as_ref(),
            &self.processors,
            self.external.as_ref(),
            self.reporter,
            &self.scheme,
        );
    }

    /// Resolution engine over `suites`, sharing this preprocessor's registry and reporter.
    pub fn engine<'a>(&'a self, suites: &'a Suites) -> Engine<'a> {
        return Engine::new(&suites.resolution, self.external.as_ref(), self.reporter, &self.scheme);
    }

    /// Rewrite every document in place. Suites and scope tables are rebuilt
    /// for this call and dropped at the end of it.
    ///
    /// # Errors
    ///
    /// Returns loader errors; reference problems are reported, not returned.
    pub fn process_files(&self, files: &mut [Document], ctx: &mut dyn BuildContext) -> Result<(), Error> {
        let suites = self.build_suites()?;
        for dir in suites.watch_roots(&self.root, &self.loader.sources()) {
            ctx.watch(&dir);
        }

        let mut scopes = ScopeTracker::default();
        for document in files.iter_mut() {
            debug!("processing {}", document.path.display());
            self.process_document(&suites, &mut scopes, document, ctx);
        }
        return Ok(());
    }

    /// Rewrite one document against prepared suites.
    pub fn process_document(
        &self,
        suites: &Suites,
        scopes: &mut ScopeTracker,
        document: &mut Document,
        ctx: &mut dyn BuildContext,
    ) {
        document.content = self.replace_render_tags(suites, document, ctx);
        document.content = self.replace_scope_tags(suites, scopes, document);

        let empty = ScopeTable::default();
        let table = scopes.scoped_objects(&document.path).unwrap_or(&empty);
        let engine = self.engine(suites);
        document.content = replace_backticks(&engine, table, document);
        document.content = self.replace_link_tags(&engine, table, document);
    }

    /// Substitute rendered documentation for each render tag, resolving only
    /// against the publication suite.
    fn replace_render_tags(&self, suites: &Suites, document: &Document, ctx: &mut dyn BuildContext) -> String {
        let found = tags::find_block_tags(
            &document.content,
            &self.names.render,
            &self.patterns.render,
            RenderOptions::KEYS,
        );
        return tags::splice(&document.content, &found, |tag: &Tag| {
            let fqn = tag.args.as_str();
            let objects = suites.publication.resolve_fqn(fqn);

            let Some(object) = objects.first() else {
                self.reporter.report(Warning::MissingRenderTarget {
                    document: document.path.clone(),
                    fqn: fqn.to_string(),
                });
                return Some(String::new());
            };
            if objects.len() > 1 {
                self.reporter.report(Warning::AmbiguousRenderTarget {
                    count: objects.len(),
                    document: document.path.clone(),
                    fqn: fqn.to_string(),
                });
            }

            info!("rendering @{} {fqn}", tag.name);
            let options = RenderOptions::from_tag_options(&tag.options);
            let fragment = self.renderer.render_object(&suites.publication, object, &options);
            return Some(ctx.repeat(&document.path, &document.output_path, fragment));
        });
    }

    /// Record every resolution-suite match of each scope tag under its own
    /// name, and remove the tag.
    fn replace_scope_tags(&self, suites: &Suites, scopes: &mut ScopeTracker, document: &Document) -> String {
        let found = tags::find_block_tags(&document.content, &self.names.scope, &self.patterns.scope, &[]);
        return tags::splice(&document.content, &found, |tag: &Tag| {
            let name = tag.args.as_str();
            let objects = suites.resolution.resolve_fqn(name);

            if objects.is_empty() {
                self.reporter.report(Warning::MissingScopeTarget {
                    document: document.path.clone(),
                    name: name.to_string(),
                });
            } else {
                let listed: Vec<String> = objects
                    .iter()
                    .map(|o| return format!("{}:{}", o.kind.label(), o.name))
                    .collect();
                info!("adding scope objects for @{} {name}: {}", tag.name, listed.join(", "));
            }

            for object in objects {
                scopes.declare(&document.path, &object.name, object.id);
            }
            return Some(String::new());
        });
    }

    /// Resolve each link tag; an unresolved one becomes its name as code.
    fn replace_link_tags(&self, engine: &Engine<'_>, table: &ScopeTable, document: &Document) -> String {
        let found = tags::find_inline_tags(&document.content, &self.names.link, &self.patterns.link);
        return tags::splice(&document.content, &found, |tag: &Tag| {
            let name = tag.args.as_str();
            info!("processing @{} tag {name}", tag.name);

            if let Some(link) = engine.resolve(Context::Document(table), name).into_link() {
                return Some(link);
            }
            self.reporter.report(Warning::UnresolvedReference {
                document: document.path.clone(),
                name: name.to_string(),
            });
            return Some(format!("`{name}`"));
        });
    }
}

/// Resolve each backtick span, leaving unresolved spans byte-identical.
fn replace_backticks(engine: &Engine<'_>, table: &ScopeTable, document: &Document) -> String {
    let found = tags::find_backtick_spans(&document.content);
    return tags::splice(&document.content, &found, |span: &BacktickSpan| {
        debug!("processing backtick `{}`", span.name);
        return engine.resolve(Context::Document(table), &span.name).into_link();
    });
}
