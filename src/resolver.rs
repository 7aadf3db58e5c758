//! The resolution engine: decides which documented entity a name denotes.

use tracing::{debug, info};

use crate::diagnostics::{Reporter, Warning};
use crate::external::ExternalRegistry;
use crate::index::CorpusIndex;
use crate::scope::ScopeTable;
use crate::types::{ApiObject, ObjectId, ObjectKind, ResolvedLink};

/// Longest indirection chain followed before giving up.
pub const MAX_INDIRECTION_DEPTH: usize = 32;

/// Link resolution shared by every processor in the pipeline.
pub trait Resolver {
    /// Resolve `name` to link text, optionally relative to the object whose FQN
    /// is `scope`. `None` means unresolved.
    fn resolve_ref(&self, scope: Option<&str>, name: &str) -> Option<String>;

    /// Resolve `name` with no scope.
    #[allow(dead_code, reason = "only the tests resolve without a scope")]
    fn resolve_name(&self, name: &str) -> Option<String> {
        return self.resolve_ref(None, name);
    }
}

/// What a name is resolved relative to.
#[derive(Debug, Clone, Copy)]
pub enum Context<'a> {
    /// A document's declared scopes, consulted when exact lookup fails.
    Document(&'a ScopeTable),
    /// No context: exact FQN, then the external registry.
    Global,
    /// A corpus object; lexical lookup from it is tried first.
    Object(ObjectId),
}

/// Tag name of canonical internal links. Reserved: an input tag with this name
/// would match already-resolved output.
pub const LINK_TAG: &str = "link";

/// Format the canonical internal link for an FQN.
pub fn internal_link(scheme: &str, fqn: &str) -> String {
    return format!("{{@{LINK_TAG} {scheme}:{fqn}}}");
}

/// Resolves names against the resolution suite, falling back to an external
/// registry. Read-only apart from the warnings it reports.
pub struct Engine<'a> {
    external: &'a dyn ExternalRegistry,
    index: &'a CorpusIndex,
    reporter: &'a dyn Reporter,
    scheme: &'a str,
}

impl<'a> Engine<'a> {
    /// Engine over `index` (the unfiltered resolution suite).
    pub fn new(
        index: &'a CorpusIndex,
        external: &'a dyn ExternalRegistry,
        reporter: &'a dyn Reporter,
        scheme: &'a str,
    ) -> Self {
        return Self {
            external,
            index,
            reporter,
            scheme,
        };
    }

    /// Resolve `name` in `context`, following indirections to a concrete object.
    pub fn resolve(&self, context: Context<'_>, name: &str) -> ResolvedLink {
        let mut chain = Vec::new();
        return self.resolve_following(context, name, &mut chain);
    }

    /// Pick the single object `name` denotes, or `None` when nothing in the
    /// corpus matches. Ambiguity is reported and settled by taking the first match.
    pub fn resolve_object(&self, context: Context<'_>, name: &str) -> Option<&'a ApiObject> {
        if let Context::Object(scope) = context
            && let Some(found) = self.index.get(scope).and_then(|node| return self.index.resolve_reference(node, name))
        {
            return Some(found);
        }

        let mut candidates = self.index.resolve_fqn(name);

        if candidates.is_empty()
            && let Context::Document(table) = context
        {
            candidates = self.scope_candidates(table, name);
        }

        let (first, rest) = candidates.split_first()?;
        if !rest.is_empty() {
            self.reporter.report(Warning::AmbiguousMatch {
                candidates: candidates
                    .iter()
                    .map(|c| return format!("{} {}", c.kind.label(), c.fqn()))
                    .collect(),
                name: name.to_string(),
            });
        }
        return Some(*first);
    }

    /// Fallback candidates from a document's scope table, in declaration order.
    /// An entry whose own name is `name` matches directly; otherwise `name` must
    /// resolve to a direct member of the entry.
    fn scope_candidates(&self, table: &ScopeTable, name: &str) -> Vec<&'a ApiObject> {
        let mut found = Vec::new();
        for (declared, id) in table.iter() {
            let Some(node) = self.index.get(id) else {
                continue;
            };
            debug!("resolving {name} against scope {declared}");

            if declared == name {
                found.push(node);
            }
            if let Some(member) = self.index.resolve_contextual(node, name) {
                found.push(member);
            }
        }
        return found;
    }

    /// Resolve, recursing through indirection targets. `chain` holds the names
    /// already followed so a loop is caught instead of recursing forever.
    fn resolve_following(&self, context: Context<'_>, name: &str, chain: &mut Vec<String>) -> ResolvedLink {
        let Some(object) = self.resolve_object(context, name) else {
            return self.resolve_external(name);
        };

        let ObjectKind::Indirection { target } = &object.kind else {
            let fqn = object.fqn();
            let link = internal_link(self.scheme, &fqn);
            info!("TAG {name} -> {link}");
            return ResolvedLink::Internal { fqn, link };
        };

        chain.push(name.to_string());
        if chain.iter().any(|seen| return seen == target) || chain.len() > MAX_INDIRECTION_DEPTH {
            let mut cycle = chain.clone();
            cycle.push(target.clone());
            self.reporter.report(Warning::IndirectionCycle { chain: cycle });
            return ResolvedLink::Unresolved;
        }

        info!("INDIRECTION {name} -> {target}");
        return self.resolve_following(context, target, chain);
    }

    /// Last resort: the external registry.
    fn resolve_external(&self, name: &str) -> ResolvedLink {
        if let Some(resolution) = self.external.resolve_name(name) {
            info!("EXTERNAL {name} -> {}", resolution.md_link);
            return ResolvedLink::External(resolution);
        }
        debug!("NO MATCH {name}");
        return ResolvedLink::Unresolved;
    }
}

impl Resolver for Engine<'_> {
    fn resolve_ref(&self, scope: Option<&str>, name: &str) -> Option<String> {
        let context = scope
            .and_then(|fqn| return self.index.resolve_fqn(fqn).first().map(|node| return node.id))
            .map_or(Context::Global, Context::Object);
        return self.resolve(context, name).into_link();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::external::StdlibRegistry;
    use crate::types::ApiNode;

    fn index(value: serde_json::Value) -> CorpusIndex {
        let modules: Vec<ApiNode> = serde_json::from_value(value).unwrap();
        CorpusIndex::from_modules(&modules)
    }

    fn widget_index() -> CorpusIndex {
        index(serde_json::json!([
            {
                "kind": "module",
                "name": "pkg",
                "members": [
                    {"kind": "indirection", "name": "Widget", "target": "pkg.mod.Widget"},
                    {"kind": "indirection", "name": "W", "target": "pkg.Widget"},
                    {"kind": "indirection", "name": "Stream", "target": "typing.IO"},
                    {
                        "kind": "module",
                        "name": "mod",
                        "members": [
                            {
                                "kind": "class",
                                "name": "Widget",
                                "members": [{"kind": "function", "name": "render"}]
                            }
                        ]
                    }
                ]
            }
        ]))
    }

    fn link(fqn: &str) -> ResolvedLink {
        ResolvedLink::Internal {
            fqn: fqn.to_string(),
            link: internal_link("pydoc", fqn),
        }
    }

    #[test]
    fn unique_match_links_full_path() {
        let idx = widget_index();
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        assert_eq!(engine.resolve(Context::Global, "pkg.mod.Widget"), link("pkg.mod.Widget"));
        assert_eq!(
            engine.resolve(Context::Global, "pkg.mod.Widget").into_link().unwrap(),
            "{@link pydoc:pkg.mod.Widget}"
        );
        assert_eq!(diagnostics.count(), 0);
    }

    #[test]
    fn indirection_chain_resolves_like_its_target() {
        let idx = widget_index();
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        let direct = engine.resolve(Context::Global, "pkg.mod.Widget");
        assert_eq!(engine.resolve(Context::Global, "pkg.Widget"), direct);
        assert_eq!(engine.resolve(Context::Global, "pkg.W"), direct);
    }

    #[test]
    fn indirection_to_external_name_uses_registry() {
        let idx = widget_index();
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        let ResolvedLink::External(found) = engine.resolve(Context::Global, "pkg.Stream") else {
            panic!("expected an external link");
        };
        assert_eq!(found.name, "typing.IO");
    }

    #[test]
    fn unknown_name_falls_back_then_fails() {
        let idx = widget_index();
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        assert!(matches!(engine.resolve(Context::Global, "typing.IO"), ResolvedLink::External(_)));
        assert_eq!(engine.resolve(Context::Global, "nothing.here"), ResolvedLink::Unresolved);
        assert_eq!(diagnostics.count(), 0);
    }

    #[test]
    fn ambiguous_match_picks_first_every_time() {
        let idx = index(serde_json::json!([
            {"kind": "module", "name": "pkg", "members": [{"kind": "class", "name": "X", "docstring": "first"}]},
            {"kind": "module", "name": "pkg", "members": [{"kind": "function", "name": "X", "docstring": "second"}]}
        ]));
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        let matches = idx.resolve_fqn("pkg.X");
        assert_eq!(matches.len(), 2);
        for _ in 0..3 {
            let picked = engine.resolve_object(Context::Global, "pkg.X").unwrap();
            assert_eq!(picked.id, matches[0].id);
            assert_eq!(picked.docstring.as_deref(), Some("first"));
        }

        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings.len(), 3);
        assert_eq!(
            warnings[0],
            Warning::AmbiguousMatch {
                candidates: vec!["class pkg.X".into(), "function pkg.X".into()],
                name: "pkg.X".into(),
            }
        );
    }

    #[test]
    fn cyclic_indirection_is_reported_not_followed_forever() {
        let idx = index(serde_json::json!([
            {
                "kind": "module",
                "name": "pkg",
                "members": [
                    {"kind": "indirection", "name": "A", "target": "pkg.B"},
                    {"kind": "indirection", "name": "B", "target": "pkg.A"},
                    {"kind": "indirection", "name": "Me", "target": "pkg.Me"}
                ]
            }
        ]));
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        assert_eq!(engine.resolve(Context::Global, "pkg.A"), ResolvedLink::Unresolved);
        assert_eq!(engine.resolve(Context::Global, "pkg.Me"), ResolvedLink::Unresolved);
        assert_eq!(
            diagnostics.into_warnings()[0],
            Warning::IndirectionCycle {
                chain: vec!["pkg.A".into(), "pkg.B".into(), "pkg.A".into()],
            }
        );
    }

    #[test]
    fn indirection_chains_stop_past_the_depth_limit() {
        let mut members: Vec<serde_json::Value> = (0..=MAX_INDIRECTION_DEPTH)
            .map(|i| {
                serde_json::json!({
                    "kind": "indirection",
                    "name": format!("I{i}"),
                    "target": format!("pkg.I{}", i + 1),
                })
            })
            .collect();
        members.push(serde_json::json!({"kind": "class", "name": format!("I{}", MAX_INDIRECTION_DEPTH + 1)}));
        let idx = index(serde_json::json!([{"kind": "module", "name": "pkg", "members": members}]));
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        // I1 reaches the class through exactly MAX_INDIRECTION_DEPTH indirections.
        assert_eq!(
            engine.resolve(Context::Global, "pkg.I1"),
            ResolvedLink::Internal {
                fqn: "pkg.I33".into(),
                link: "{@link pydoc:pkg.I33}".into(),
            }
        );
        assert_eq!(diagnostics.count(), 0);

        // I0 needs one more.
        assert_eq!(engine.resolve(Context::Global, "pkg.I0"), ResolvedLink::Unresolved);
        let warnings = diagnostics.into_warnings();
        assert_eq!(warnings.len(), 1);
        let Warning::IndirectionCycle { chain } = &warnings[0] else {
            panic!("expected an indirection warning, got {warnings:?}");
        };
        assert_eq!(chain.len(), MAX_INDIRECTION_DEPTH + 2);
        assert_eq!(chain.first().map(String::as_str), Some("pkg.I0"));
        assert_eq!(chain.last().map(String::as_str), Some("pkg.I33"));
    }

    #[test]
    fn document_scope_resolves_members_and_declared_names() {
        let idx = widget_index();
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        let mut table = ScopeTable::default();
        let widget = idx.resolve_fqn("pkg.mod.Widget")[0];
        table.declare(&widget.name, widget.id);

        assert_eq!(engine.resolve(Context::Document(&table), "render"), link("pkg.mod.Widget.render"));
        assert_eq!(engine.resolve(Context::Document(&table), "Widget"), link("pkg.mod.Widget"));
        assert_eq!(engine.resolve(Context::Global, "render"), ResolvedLink::Unresolved);
    }

    #[test]
    fn scope_is_only_a_fallback() {
        let idx = index(serde_json::json!([
            {"kind": "module", "name": "render"},
            {"kind": "module", "name": "pkg", "members": [{"kind": "function", "name": "render"}]}
        ]));
        let registry = StdlibRegistry::default();
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        let mut table = ScopeTable::default();
        let pkg = idx.resolve_fqn("pkg")[0];
        table.declare("pkg", pkg.id);

        assert_eq!(engine.resolve(Context::Document(&table), "render"), link("render"));
    }

    #[test]
    fn resolver_scope_uses_lexical_lookup_first() {
        let idx = widget_index();
        let registry = StdlibRegistry::new("https://docs.example", Vec::new(), BTreeMap::new());
        let diagnostics = Diagnostics::default();
        let engine = Engine::new(&idx, &registry, &diagnostics, "pydoc");

        assert_eq!(
            engine.resolve_ref(Some("pkg.mod.Widget.render"), "Widget").as_deref(),
            Some("{@link pydoc:pkg.mod.Widget}")
        );
        assert_eq!(engine.resolve_name("render"), None);
        assert_eq!(
            engine.resolve_name("pkg.W").as_deref(),
            Some("{@link pydoc:pkg.mod.Widget}")
        );
        // Unknown scope degrades to a global lookup.
        assert_eq!(
            engine.resolve_ref(Some("no.such.scope"), "pkg.mod.Widget").as_deref(),
            Some("{@link pydoc:pkg.mod.Widget}")
        );
    }
}
