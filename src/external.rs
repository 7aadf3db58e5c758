//! Fallback links into external (standard-library) documentation.

use std::collections::BTreeMap;

use crate::types::ExternalResolution;

/// Looks up names that are not part of the local corpus.
pub trait ExternalRegistry {
    /// Resolve `name` to an external documentation link, if the registry knows it.
    fn resolve_name(&self, name: &str) -> Option<ExternalResolution>;
}

/// Default documentation root for the Python standard library.
pub const DEFAULT_BASE_URL: &str = "https://docs.python.org/3";

/// Standard-library modules resolvable out of the box.
pub const DEFAULT_MODULES: &[&str] = &[
    "abc", "argparse", "asyncio", "base64", "collections", "collections.abc", "contextlib", "copy",
    "csv", "dataclasses", "datetime", "decimal", "enum", "functools", "glob", "hashlib", "heapq",
    "importlib", "inspect", "io", "itertools", "json", "logging", "math", "operator", "os",
    "os.path", "pathlib", "pickle", "random", "re", "shutil", "socket", "sqlite3", "string",
    "subprocess", "sys", "tempfile", "textwrap", "threading", "time", "types", "typing", "unittest",
    "urllib", "urllib.parse", "uuid", "warnings", "weakref",
];

/// Built-in functions, documented on the `functions` page.
const BUILTIN_FUNCTIONS: &[&str] = &[
    "abs", "all", "any", "callable", "enumerate", "filter", "getattr", "hasattr", "isinstance",
    "issubclass", "iter", "len", "map", "max", "min", "next", "open", "print", "repr", "sorted",
    "sum", "zip",
];

/// Built-in types, documented on the `stdtypes` page.
const BUILTIN_TYPES: &[&str] = &[
    "bool", "bytearray", "bytes", "dict", "float", "frozenset", "int", "list", "memoryview",
    "object", "range", "set", "str", "tuple", "type",
];

/// Built-in exceptions, documented on the `exceptions` page.
const BUILTIN_EXCEPTIONS: &[&str] = &[
    "AttributeError", "BaseException", "Exception", "FileNotFoundError", "ImportError",
    "IndexError", "KeyError", "LookupError", "NotImplementedError", "OSError", "RuntimeError",
    "StopIteration", "TypeError", "ValueError",
];

/// Registry over the Python standard library documentation layout:
/// `<base>/library/<module>.html#<name>`, plus explicit per-name overrides.
#[derive(Debug, Clone)]
pub struct StdlibRegistry {
    base_url: String,
    modules: Vec<String>,
    names: BTreeMap<String, String>,
}

impl Default for StdlibRegistry {
    fn default() -> Self {
        return Self::new(
            DEFAULT_BASE_URL,
            DEFAULT_MODULES.iter().map(|m| return (*m).to_string()).collect(),
            BTreeMap::new(),
        );
    }
}

impl StdlibRegistry {
    /// Registry rooted at `base_url`, knowing `modules`, with `names` mapping
    /// exact names to URLs ahead of the module rules.
    pub fn new(base_url: &str, modules: Vec<String>, names: BTreeMap<String, String>) -> Self {
        return Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            modules,
            names,
        };
    }

    /// The longest known module that is `name` itself or a dotted prefix of it.
    fn owning_module(&self, name: &str) -> Option<&str> {
        return self
            .modules
            .iter()
            .filter(|module| {
                return name == module.as_str()
                    || name.strip_prefix(module.as_str()).is_some_and(|rest| return rest.starts_with('.'));
            })
            .max_by_key(|module| return module.len())
            .map(String::as_str);
    }

    /// URL for a name with no explicit override.
    fn url_for(&self, name: &str) -> Option<String> {
        let base = &self.base_url;
        if BUILTIN_FUNCTIONS.contains(&name) {
            return Some(format!("{base}/library/functions.html#{name}"));
        }
        if BUILTIN_TYPES.contains(&name) {
            return Some(format!("{base}/library/stdtypes.html#{name}"));
        }
        if BUILTIN_EXCEPTIONS.contains(&name) {
            return Some(format!("{base}/library/exceptions.html#{name}"));
        }

        let module = self.owning_module(name)?;
        if module == name {
            return Some(format!("{base}/library/{module}.html"));
        }
        return Some(format!("{base}/library/{module}.html#{name}"));
    }
}

impl ExternalRegistry for StdlibRegistry {
    fn resolve_name(&self, name: &str) -> Option<ExternalResolution> {
        let url = match self.names.get(name) {
            Some(url) => url.clone(),
            None => self.url_for(name)?,
        };
        return Some(ExternalResolution {
            md_link: format!("[`{name}`]({url})"),
            name: name.to_string(),
            url,
        });
    }
}
