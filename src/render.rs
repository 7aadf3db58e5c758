//! Markdown rendering of a published object's documentation.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::index::CorpusIndex;
use crate::types::{ApiObject, ObjectKind};

/// Deepest Markdown heading level.
const MAX_HEADER_LEVEL: usize = 6;

/// Options taken from a render tag's option lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Heading level of the rendered object; members go one deeper.
    pub header_level: usize,
    /// Whether to render members recursively.
    pub members: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        return Self {
            header_level: 2,
            members: true,
        };
    }
}

impl RenderOptions {
    /// Option keys a render tag accepts.
    pub const KEYS: &'static [&'static str] = &["header_level", "members"];

    /// Read options from tag option lines. Unknown keys and unparsable values
    /// keep their defaults.
    pub fn from_tag_options(options: &BTreeMap<String, String>) -> Self {
        let mut parsed = Self::default();
        if let Some(level) = options.get("header_level").and_then(|v| return v.parse::<usize>().ok()) {
            parsed.header_level = level.clamp(1, MAX_HEADER_LEVEL);
        }
        if let Some(members) = options.get("members").and_then(|v| return v.parse::<bool>().ok()) {
            parsed.members = members;
        }
        return parsed;
    }
}

/// Produces the content fragment substituted for a render tag. The output
/// must depend only on the object and options so the substitution can be
/// repeated without rerunning the pipeline.
pub trait Renderer {
    /// Render `object`, a member of `index`.
    fn render_object(&self, index: &CorpusIndex, object: &ApiObject, options: &RenderOptions) -> String;
}

/// Renders anchors, headings and docstrings, members nested one heading
/// level deeper. A module's own heading is left to the page.
pub struct MarkdownRenderer {
    scheme: String,
}

impl MarkdownRenderer {
    /// Renderer whose anchors use the link `scheme`.
    pub fn new(scheme: &str) -> Self {
        return Self {
            scheme: scheme.to_string(),
        };
    }

    fn render_into(&self, index: &CorpusIndex, object: &ApiObject, level: usize, options: &RenderOptions, out: &mut String) {
        let fqn = object.fqn();
        let _ = writeln!(out, "@anchor {}:{fqn}", self.scheme);

        let child_level = if object.kind == ObjectKind::Module {
            level
        } else {
            let hashes = "#".repeat(level.min(MAX_HEADER_LEVEL));
            let _ = writeln!(out, "{hashes} {}\n", heading_text(object));
            level + 1
        };

        if let Some(doc) = object.docstring.as_deref().map(str::trim).filter(|d| return !d.is_empty()) {
            let _ = writeln!(out, "{doc}\n");
        } else {
            out.push('\n');
        }

        if !options.members {
            return;
        }
        for child in object.children.iter().filter_map(|id| return index.get(*id)) {
            if matches!(child.kind, ObjectKind::Indirection { .. }) {
                continue;
            }
            self.render_into(index, child, child_level, options, out);
        }
    }
}

impl Renderer for MarkdownRenderer {
    fn render_object(&self, index: &CorpusIndex, object: &ApiObject, options: &RenderOptions) -> String {
        let mut out = String::new();
        self.render_into(index, object, options.header_level, options, &mut out);
        return out.trim_end().to_string();
    }
}

/// Heading text for an object: functions get call parentheses.
fn heading_text(object: &ApiObject) -> String {
    return match object.kind {
        ObjectKind::Function => format!("{}()", object.name),
        ObjectKind::Class => format!("class {}", object.name),
        _ => object.name.clone(),
    };
}
