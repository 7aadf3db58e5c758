use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::external::{DEFAULT_BASE_URL, DEFAULT_MODULES, StdlibRegistry};
use crate::processors::FilterProcessor;

/// Name of the project config file.
pub const CONFIG_FILE: &str = ".doclink.toml";

/// Project configuration loaded from `.doclink.toml`.
/// Include/exclude patterns are path prefixes applied to markdown files,
/// relative to the docs directory.
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON corpus files, relative to the project root.
    pub corpus: Vec<PathBuf>,
    /// Markdown input directory.
    pub docs: PathBuf,
    exclude: Vec<String>,
    /// External registry settings.
    pub external: ExternalConfig,
    /// Publication filter settings.
    pub filter: FilterConfig,
    include: Vec<String>,
    /// Scheme of canonical internal links.
    pub link_scheme: String,
    /// Directory rewritten markdown is written to.
    pub output: PathBuf,
    /// Tag names.
    pub tags: TagNames,
}

/// Names of the three tag syntaxes.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct TagNames {
    /// Inline link tag: `{@pylink name}`.
    pub link: String,
    /// Block render tag: `@pydoc fqn`.
    pub render: String,
    /// Block scope tag: `@pyscope fqn`.
    pub scope: String,
}

impl Default for TagNames {
    fn default() -> Self {
        return Self {
            link: "pylink".to_string(),
            render: "pydoc".to_string(),
            scope: "pyscope".to_string(),
        };
    }
}

/// `[filter]` table.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// See [`FilterProcessor::documented_only`].
    pub documented_only: bool,
    /// See [`FilterProcessor::exclude_private`].
    pub exclude_private: bool,
    /// See [`FilterProcessor::skip_empty_modules`].
    pub skip_empty_modules: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let defaults = FilterProcessor::default();
        return Self {
            documented_only: defaults.documented_only,
            exclude_private: defaults.exclude_private,
            skip_empty_modules: defaults.skip_empty_modules,
        };
    }
}

impl FilterConfig {
    /// The filter stage these settings describe.
    pub const fn processor(&self) -> FilterProcessor {
        return FilterProcessor {
            documented_only: self.documented_only,
            exclude_private: self.exclude_private,
            skip_empty_modules: self.skip_empty_modules,
        };
    }
}

/// `[external]` table.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Documentation root, e.g. `https://docs.python.org/3`.
    pub base_url: String,
    /// Modules linked by page; replaces the built-in list when given.
    pub modules: Option<Vec<String>>,
    /// Exact name to URL overrides.
    pub names: BTreeMap<String, String>,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        return Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            modules: None,
            names: BTreeMap::new(),
        };
    }
}

impl ExternalConfig {
    /// The registry these settings describe.
    pub fn registry(&self) -> StdlibRegistry {
        let modules = self
            .modules
            .clone()
            .unwrap_or_else(|| return DEFAULT_MODULES.iter().map(|m| return (*m).to_string()).collect());
        return StdlibRegistry::new(&self.base_url, modules, self.names.clone());
    }
}

/// Raw TOML structure for `.doclink.toml`.
#[derive(serde::Deserialize)]
#[serde(deny_unknown_fields)]
struct DoclinkTomlConfig {
    #[serde(default)]
    corpus: Option<Vec<PathBuf>>,
    #[serde(default)]
    docs: Option<PathBuf>,
    #[serde(default)]
    exclude: Vec<String>,
    #[serde(default)]
    external: ExternalConfig,
    #[serde(default)]
    filter: FilterConfig,
    #[serde(default)]
    include: Vec<String>,
    #[serde(default)]
    link_scheme: Option<String>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    tags: TagNames,
}

impl Config {
    /// Load config from `.doclink.toml` in the given root directory.
    /// Returns the defaults if the file doesn't exist.
    /// Returns an error if the file exists but is malformed; never silently
    /// falls back to defaults when the user wrote a config file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if reading fails (other than not-found),
    /// or `Error::TomlDe` if the TOML is malformed.
    pub fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join(CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::Io(e)),
        };
        return Self::parse(&content);
    }

    /// Parse config from TOML content.
    ///
    /// # Errors
    ///
    /// Returns `Error::TomlDe` if the TOML is malformed or has unknown keys.
    pub fn parse(content: &str) -> Result<Self, Error> {
        let raw: DoclinkTomlConfig = toml::from_str(content)?;
        let defaults = Self::default();
        return Ok(Self {
            corpus: raw.corpus.unwrap_or(defaults.corpus),
            docs: raw.docs.unwrap_or(defaults.docs),
            exclude: raw.exclude,
            external: raw.external,
            filter: raw.filter,
            include: raw.include,
            link_scheme: raw.link_scheme.unwrap_or(defaults.link_scheme),
            output: raw.output.unwrap_or(defaults.output),
            tags: raw.tags,
        });
    }

    /// Check whether a markdown file path should be scanned.
    ///
    /// A path is included if no include patterns are set (scan everything),
    /// or if the path starts with at least one include pattern.
    /// An included path is then excluded if it starts with any exclude pattern.
    pub fn should_scan(&self, relative_path: &str) -> bool {
        let included = self.include.is_empty()
            || self.include.iter().any(|p| relative_path.starts_with(p.as_str()));

        if !included {
            return false;
        }

        !self.exclude.iter().any(|p| relative_path.starts_with(p.as_str()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            corpus: vec![PathBuf::from("build/api.json")],
            docs: PathBuf::from("docs"),
            exclude: Vec::new(),
            external: ExternalConfig::default(),
            filter: FilterConfig::default(),
            include: Vec::new(),
            link_scheme: "pydoc".to_string(),
            output: PathBuf::from("site"),
            tags: TagNames::default(),
        }
    }
}
