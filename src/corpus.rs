//! Corpus loading and the flattened object arena.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Error;
use crate::types::{ApiNode, ApiObject, NodeKind, ObjectId, ObjectKind};

/// Produces raw module trees. Every call must return a fresh, independent load:
/// the resolution and publication suites are built from separate loads, and the
/// processing pipeline mutates what it is given.
///
/// Trees are returned in a stable enumeration order. The first-match tie-break
/// for ambiguous names is only reproducible because of that order.
pub trait Loader {
    /// Load all module trees.
    ///
    /// # Errors
    ///
    /// Returns an error when a corpus source is missing or malformed.
    fn load(&self) -> Result<Vec<ApiNode>, Error>;

    /// Files the load reads, so a watcher can pick up regenerated corpora.
    fn sources(&self) -> Vec<PathBuf> {
        return Vec::new();
    }
}

/// Loads module trees from JSON corpus files, in configured file order.
pub struct JsonLoader {
    paths: Vec<PathBuf>,
}

impl JsonLoader {
    /// Loader over the given corpus files.
    pub const fn new(paths: Vec<PathBuf>) -> Self {
        return Self { paths };
    }
}

impl Loader for JsonLoader {
    fn load(&self) -> Result<Vec<ApiNode>, Error> {
        let mut modules = Vec::new();
        for path in &self.paths {
            let mut loaded = load_corpus_file(path)?;
            debug!("loaded {} modules from {}", loaded.len(), path.display());
            modules.append(&mut loaded);
        }
        return Ok(modules);
    }

    fn sources(&self) -> Vec<PathBuf> {
        return self.paths.clone();
    }
}

/// Read, parse and validate one corpus file.
///
/// # Errors
///
/// Returns `Error::CorpusNotFound`, `Error::CorpusParse` or `Error::CorpusInvalid`.
fn load_corpus_file(path: &Path) -> Result<Vec<ApiNode>, Error> {
    let content = match std::fs::read_to_string(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::CorpusNotFound { path: path.to_path_buf() });
        },
        Err(e) => return Err(Error::Io(e)),
        Ok(c) => c,
    };

    let modules: Vec<ApiNode> = serde_json::from_str(&content).map_err(|e| {
        return Error::CorpusParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };
    })?;

    for module in &modules {
        validate_node(module, "", path)?;
    }
    return Ok(modules);
}

/// Check the shape invariants the resolver relies on, recursively.
///
/// # Errors
///
/// Returns `Error::CorpusInvalid` naming the first offending object.
fn validate_node(node: &ApiNode, parent_fqn: &str, path: &Path) -> Result<(), Error> {
    let fqn = if parent_fqn.is_empty() {
        node.name.clone()
    } else {
        format!("{parent_fqn}.{}", node.name)
    };

    let invalid = |reason: String| {
        return Error::CorpusInvalid {
            path: path.to_path_buf(),
            reason,
        };
    };

    if node.name.is_empty() || node.name.contains('.') {
        return Err(invalid(format!("object under `{parent_fqn}` has invalid name `{}`", node.name)));
    }

    match (node.kind, &node.target) {
        (NodeKind::Indirection, None) => {
            return Err(invalid(format!("indirection `{fqn}` has no target")));
        },
        (NodeKind::Indirection, Some(target)) if target.trim().is_empty() => {
            return Err(invalid(format!("indirection `{fqn}` has an empty target")));
        },
        (NodeKind::Indirection, Some(_)) | (_, None) => {},
        (_, Some(_)) => {
            return Err(invalid(format!("`{fqn}` is not an indirection but has a target")));
        },
    }

    for member in &node.members {
        validate_node(member, &fqn, path)?;
    }
    return Ok(());
}

/// Flattened, read-only arena of API objects in pre-order.
#[derive(Debug, Default)]
pub struct Corpus {
    objects: Vec<ApiObject>,
    roots: Vec<ObjectId>,
}

impl Corpus {
    /// Flatten module trees. Pre-order keeps parents ahead of their members and
    /// preserves the loader's enumeration order.
    pub fn from_modules(modules: &[ApiNode]) -> Self {
        let mut corpus = Self::default();
        for module in modules {
            let id = corpus.push_node(module, None, &[]);
            corpus.roots.push(id);
        }
        return corpus;
    }

    /// Append `node` and its members, returning the node's id.
    fn push_node(&mut self, node: &ApiNode, parent: Option<ObjectId>, parent_path: &[String]) -> ObjectId {
        let id = ObjectId(self.objects.len());
        let mut path = parent_path.to_vec();
        path.push(node.name.clone());

        let kind = match (node.kind, &node.target) {
            (NodeKind::Indirection, Some(target)) => ObjectKind::Indirection {
                target: target.trim().to_string(),
            },
            // Validated loads never get here; a hand-built tree degrades to a variable.
            (NodeKind::Indirection, None) | (NodeKind::Variable, _) => ObjectKind::Variable,
            (NodeKind::Class, _) => ObjectKind::Class,
            (NodeKind::Function, _) => ObjectKind::Function,
            (NodeKind::Module, _) => ObjectKind::Module,
        };

        self.objects.push(ApiObject {
            children: Vec::new(),
            docstring: node.docstring.clone(),
            id,
            kind,
            location: node.location.clone(),
            name: node.name.clone(),
            parent,
            path: path.clone(),
        });

        for member in &node.members {
            let child = self.push_node(member, Some(id), &path);
            if let Some(object) = self.objects.get_mut(id.0) {
                object.children.push(child);
            }
        }
        return id;
    }

    /// Look up an object by handle.
    pub fn get(&self, id: ObjectId) -> Option<&ApiObject> {
        return self.objects.get(id.0);
    }

    /// All objects in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = &ApiObject> {
        return self.objects.iter();
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        return self.objects.len();
    }

    /// Top-level modules in load order.
    pub fn roots(&self) -> impl Iterator<Item = &ApiObject> {
        return self.roots.iter().filter_map(|id| return self.get(*id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget_tree() -> Vec<ApiNode> {
        serde_json::from_value(serde_json::json!([
            {
                "kind": "module",
                "name": "pkg",
                "members": [
                    {"kind": "indirection", "name": "Widget", "target": "pkg.mod.Widget"},
                    {
                        "kind": "module",
                        "name": "mod",
                        "members": [{"kind": "class", "name": "Widget", "docstring": "A widget."}]
                    }
                ]
            }
        ]))
        .unwrap()
    }

    #[test]
    fn flattens_in_preorder_with_paths() {
        let corpus = Corpus::from_modules(&widget_tree());
        let fqns: Vec<String> = corpus.iter().map(ApiObject::fqn).collect();
        assert_eq!(fqns, ["pkg", "pkg.Widget", "pkg.mod", "pkg.mod.Widget"]);

        let widget = corpus.get(ObjectId(3)).unwrap();
        assert_eq!(widget.path.last(), Some(&widget.name));
        assert_eq!(widget.parent, Some(ObjectId(2)));
        assert_eq!(corpus.get(ObjectId(2)).unwrap().children, [ObjectId(3)]);
    }

    #[test]
    fn indirection_keeps_target() {
        let corpus = Corpus::from_modules(&widget_tree());
        let alias = corpus.get(ObjectId(1)).unwrap();
        assert_eq!(
            alias.kind,
            ObjectKind::Indirection {
                target: "pkg.mod.Widget".to_string()
            }
        );
    }

    #[test]
    fn loads_files_in_configured_order() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.json");
        let second = dir.path().join("b.json");
        std::fs::write(&first, r#"[{"kind": "module", "name": "zeta"}]"#).unwrap();
        std::fs::write(&second, r#"[{"kind": "module", "name": "alpha"}]"#).unwrap();

        let modules = JsonLoader::new(vec![first, second]).load().unwrap();
        let names: Vec<&str> = modules.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["zeta", "alpha"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = JsonLoader::new(vec![dir.path().join("nope.json")]).load().unwrap_err();
        assert!(matches!(err, Error::CorpusNotFound { .. }));
    }

    #[test]
    fn indirection_without_target_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        std::fs::write(
            &path,
            r#"[{"kind": "module", "name": "pkg", "members": [{"kind": "indirection", "name": "X"}]}]"#,
        )
        .unwrap();

        let err = JsonLoader::new(vec![path]).load().unwrap_err();
        assert!(matches!(err, Error::CorpusInvalid { ref reason, .. } if reason.contains("pkg.X")));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("api.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonLoader::new(vec![path]).load().unwrap_err();
        assert!(matches!(err, Error::CorpusParse { .. }));
    }
}
