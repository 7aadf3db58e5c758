//! Pipeline stages applied to a fresh load before it becomes the publication suite.

use tracing::debug;

use crate::resolver::Resolver;
use crate::tags::{self, BacktickSpan, Tag};
use crate::types::{ApiNode, NodeKind};

/// One transformation stage over loaded module trees.
pub trait Processor {
    /// Transform `modules` in place. `resolver` resolves against the
    /// unfiltered resolution suite.
    fn process(&self, modules: &mut Vec<ApiNode>, resolver: &dyn Resolver);
}

/// Drops what should not be published.
#[derive(Debug, Clone)]
pub struct FilterProcessor {
    /// Drop non-module objects without a docstring, unless a member survives.
    pub documented_only: bool,
    /// Drop `_private` members; dunder names are kept.
    pub exclude_private: bool,
    /// Drop modules left with no docstring and no members.
    pub skip_empty_modules: bool,
}

impl Default for FilterProcessor {
    fn default() -> Self {
        return Self {
            documented_only: true,
            exclude_private: true,
            skip_empty_modules: true,
        };
    }
}

impl FilterProcessor {
    /// Whether to keep `node`, filtering its members first.
    fn keep(&self, node: &mut ApiNode) -> bool {
        if node.kind == NodeKind::Indirection {
            return false;
        }
        if self.exclude_private && is_private(&node.name) {
            return false;
        }

        node.members.retain_mut(|member| return self.keep(member));

        if node.kind == NodeKind::Module {
            return !self.skip_empty_modules || node.is_documented() || !node.members.is_empty();
        }
        return !self.documented_only || node.is_documented() || !node.members.is_empty();
    }
}

/// `_name` is private, `__name__` is not.
fn is_private(name: &str) -> bool {
    let dunder = name.len() > 4 && name.starts_with("__") && name.ends_with("__");
    return name.starts_with('_') && !dunder;
}

impl Processor for FilterProcessor {
    fn process(&self, modules: &mut Vec<ApiNode>, _resolver: &dyn Resolver) {
        let before = modules.len();
        modules.retain_mut(|module| return self.keep(module));
        debug!("filter kept {} of {before} modules", modules.len());
    }
}

/// Rewrites backtick spans and link tags inside docstrings, resolving each name
/// relative to the object that owns the docstring.
pub struct DocstringBacktickProcessor {
    link_pattern: regex::Regex,
    link_tag: String,
}

impl DocstringBacktickProcessor {
    /// Stage handling `{@<link_tag> name}` tags in addition to backtick spans.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidPattern` if `link_tag` is not an identifier.
    pub fn new(link_tag: &str) -> Result<Self, crate::error::Error> {
        return Ok(Self {
            link_pattern: tags::inline_tag_pattern(link_tag)?,
            link_tag: link_tag.to_string(),
        });
    }

    fn process_node(&self, node: &mut ApiNode, parent_fqn: &str, resolver: &dyn Resolver) {
        let fqn = if parent_fqn.is_empty() {
            node.name.clone()
        } else {
            format!("{parent_fqn}.{}", node.name)
        };

        if let Some(doc) = node.docstring.take() {
            node.docstring = Some(self.rewrite(&doc, &fqn, resolver));
        }
        for member in &mut node.members {
            self.process_node(member, &fqn, resolver);
        }
    }

    fn rewrite(&self, doc: &str, fqn: &str, resolver: &dyn Resolver) -> String {
        let spans = tags::find_backtick_spans(doc);
        let doc = tags::splice(doc, &spans, |span: &BacktickSpan| {
            let link = resolver.resolve_ref(Some(fqn), &span.name);
            if link.is_none() {
                debug!("SRC {} kept in {fqn}", span.name);
            }
            return link;
        });

        let link_tags = tags::find_inline_tags(&doc, &self.link_tag, &self.link_pattern);
        return tags::splice(&doc, &link_tags, |tag: &Tag| {
            return Some(resolver.resolve_ref(Some(fqn), &tag.args).unwrap_or_else(|| return format!("`{}`", tag.args)));
        });
    }
}

impl Processor for DocstringBacktickProcessor {
    fn process(&self, modules: &mut Vec<ApiNode>, resolver: &dyn Resolver) {
        for module in modules.iter_mut() {
            self.process_node(module, "", resolver);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Resolves `Known` and `pkg.Known` only, recording the scope it was asked in.
    struct FixedResolver;

    impl Resolver for FixedResolver {
        fn resolve_ref(&self, scope: Option<&str>, name: &str) -> Option<String> {
            return match name {
                "Known" | "pkg.Known" => Some(format!("<{}|{name}>", scope.unwrap_or("-"))),
                _ => None,
            };
        }
    }

    fn modules(value: serde_json::Value) -> Vec<ApiNode> {
        serde_json::from_value(value).unwrap()
    }

    fn tree() -> Vec<ApiNode> {
        modules(serde_json::json!([
            {
                "kind": "module",
                "name": "pkg",
                "docstring": "Package docs.",
                "members": [
                    {"kind": "indirection", "name": "Alias", "target": "pkg.impl.Thing"},
                    {"kind": "function", "name": "_hidden", "docstring": "Private."},
                    {"kind": "function", "name": "__call__", "docstring": "Dunder."},
                    {"kind": "function", "name": "bare"},
                    {
                        "kind": "class",
                        "name": "Holder",
                        "members": [{"kind": "function", "name": "run", "docstring": "Runs."}]
                    }
                ]
            },
            {"kind": "module", "name": "empty"}
        ]))
    }

    fn member_names(node: &ApiNode) -> Vec<&str> {
        node.members.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn filter_drops_unpublishable_objects() {
        let mut loaded = tree();
        FilterProcessor::default().process(&mut loaded, &FixedResolver);

        assert_eq!(loaded.len(), 1);
        assert_eq!(member_names(&loaded[0]), ["__call__", "Holder"]);
        assert_eq!(member_names(&loaded[0].members[1]), ["run"]);
    }

    #[test]
    fn filter_flags_can_be_relaxed() {
        let mut loaded = tree();
        let filter = FilterProcessor {
            documented_only: false,
            exclude_private: false,
            skip_empty_modules: false,
        };
        filter.process(&mut loaded, &FixedResolver);

        assert_eq!(loaded.len(), 2);
        assert_eq!(member_names(&loaded[0]), ["_hidden", "__call__", "bare", "Holder"]);
    }

    #[test]
    fn docstring_links_resolve_in_owner_scope() {
        let mut loaded = modules(serde_json::json!([
            {
                "kind": "module",
                "name": "pkg",
                "members": [{
                    "kind": "function",
                    "name": "run",
                    "docstring": "Returns `Known`, not `Other`. See {@pylink pkg.Known} and {@pylink Gone}."
                }]
            }
        ]));
        DocstringBacktickProcessor::new("pylink")
            .unwrap()
            .process(&mut loaded, &FixedResolver);

        assert_eq!(
            loaded[0].members[0].docstring.as_deref(),
            Some("Returns <pkg.run|Known>, not `Other`. See <pkg.run|pkg.Known> and `Gone`.")
        );
    }
}
