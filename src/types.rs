/// Core domain types for doclink: API objects, links, and external resolutions.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind tag of a loaded API node, as written in corpus files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A class definition.
    Class,
    /// A function or method.
    Function,
    /// A re-export or alias of another name.
    Indirection,
    /// A module or package.
    Module,
    /// A module-level or class-level variable.
    Variable,
}

/// Where an API object was defined in the documented sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Source file the object was parsed from.
    pub filename: PathBuf,
    /// One-based line number of the definition.
    #[serde(default)]
    pub lineno: u32,
}

/// One node of a loaded corpus tree. This is the shape the loader produces and
/// the processing pipeline mutates; it is flattened into [`ApiObject`]s once the
/// pipeline has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiNode {
    /// Raw docstring content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    /// What sort of object this is.
    pub kind: NodeKind,
    /// Definition site, if the loader knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Child objects in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<ApiNode>,
    /// Local identifier.
    pub name: String,
    /// Aliased FQN. Present exactly when `kind` is `indirection`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl ApiNode {
    /// Whether the docstring has any non-blank content.
    pub fn is_documented(&self) -> bool {
        return self.docstring.as_deref().is_some_and(|d| return !d.trim().is_empty());
    }
}

/// Stable handle of an object inside one [`crate::corpus::Corpus`].
/// Handles from different corpora must never be mixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(
    /// Position of the object in the corpus arena.
    pub usize,
);

/// Kind of a flattened object. Indirections carry their target instead of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    /// A class definition.
    Class,
    /// A function or method.
    Function,
    /// A re-export or alias pointing at another FQN.
    Indirection {
        /// FQN the alias points at; may itself be an indirection.
        target: String,
    },
    /// A module or package.
    Module,
    /// A variable.
    Variable,
}

impl ObjectKind {
    /// Short lowercase label used in logs and diagnostics.
    pub const fn label(&self) -> &'static str {
        return match self {
            ObjectKind::Class => "class",
            ObjectKind::Function => "function",
            ObjectKind::Indirection { .. } => "indirection",
            ObjectKind::Module => "module",
            ObjectKind::Variable => "variable",
        };
    }
}

/// A documented entity. The last element of `path` is always `name`.
#[derive(Debug, Clone)]
pub struct ApiObject {
    /// Direct members, in source order.
    pub children: Vec<ObjectId>,
    /// Raw docstring content, if any.
    pub docstring: Option<String>,
    /// This object's handle in its corpus.
    pub id: ObjectId,
    /// What sort of object this is.
    pub kind: ObjectKind,
    /// Definition site, if known.
    pub location: Option<Location>,
    /// Local identifier.
    pub name: String,
    /// Enclosing object, `None` for top-level modules.
    pub parent: Option<ObjectId>,
    /// Ancestor names from the root down to and including `name`.
    pub path: Vec<String>,
}

impl ApiObject {
    /// The fully-qualified name: `path` joined with `.`.
    pub fn fqn(&self) -> String {
        return self.path.join(".");
    }
}

/// A resolved reference to something outside the corpus, such as a
/// standard-library symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalResolution {
    /// Pre-formatted Markdown link.
    pub md_link: String,
    /// Name shown as the link text.
    pub name: String,
    /// Canonical documentation URL.
    pub url: String,
}

/// Output of the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedLink {
    /// Resolved outside the corpus via the external registry.
    External(ExternalResolution),
    /// Resolved to a corpus object.
    Internal {
        /// FQN of the concrete (non-indirection) object.
        fqn: String,
        /// Canonical internal link, e.g. `{@link pydoc:pkg.mod.Widget}`.
        link: String,
    },
    /// Nothing matched; callers keep the original text.
    Unresolved,
}

impl ResolvedLink {
    /// The link text to substitute, or `None` when unresolved.
    pub fn into_link(self) -> Option<String> {
        return match self {
            ResolvedLink::External(resolution) => Some(resolution.md_link),
            ResolvedLink::Internal { link, .. } => Some(link),
            ResolvedLink::Unresolved => None,
        };
    }
}

/// A Markdown document being rewritten in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Current text; rewritten by the preprocessor.
    pub content: String,
    /// Where the rewritten text will be written.
    pub output_path: PathBuf,
    /// Source path. Also the key of the document's scope table.
    pub path: PathBuf,
}
