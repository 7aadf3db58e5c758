//! FQN index over a corpus: exact, contextual, and lexical lookups.

use std::collections::HashMap;

use crate::corpus::Corpus;
use crate::types::{ApiNode, ApiObject, ObjectId};

/// Read-only FQN view over one corpus. Rebuilt, never updated, when the
/// corpus changes.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    by_fqn: HashMap<String, Vec<ObjectId>>,
    corpus: Corpus,
}

impl CorpusIndex {
    /// Index a flattened corpus. Objects sharing an FQN keep insertion order.
    pub fn new(corpus: Corpus) -> Self {
        let mut by_fqn: HashMap<String, Vec<ObjectId>> = HashMap::new();
        for object in corpus.iter() {
            by_fqn.entry(object.fqn()).or_default().push(object.id);
        }
        return Self { by_fqn, corpus };
    }

    /// Flatten and index module trees in one step.
    pub fn from_modules(modules: &[ApiNode]) -> Self {
        return Self::new(Corpus::from_modules(modules));
    }

    /// The underlying corpus.
    pub const fn corpus(&self) -> &Corpus {
        return &self.corpus;
    }

    /// Look up an object by handle.
    pub fn get(&self, id: ObjectId) -> Option<&ApiObject> {
        return self.corpus.get(id);
    }

    /// Exact FQN lookup. Matches come back in insertion order, which is not a
    /// ranking; callers pick among several themselves.
    pub fn resolve_fqn(&self, name: &str) -> Vec<&ApiObject> {
        return self
            .by_fqn
            .get(name)
            .map(|ids| return ids.iter().filter_map(|id| return self.get(*id)).collect())
            .unwrap_or_default();
    }

    /// Resolve `name` relative to `scope`, accepting the result only when
    /// `scope` is its direct parent.
    pub fn resolve_contextual(&self, scope: &ApiObject, name: &str) -> Option<&ApiObject> {
        return self
            .resolve_reference(scope, name)
            .filter(|found| return found.parent == Some(scope.id));
    }

    /// Lexical lookup: try the dotted `name` as a member path of `scope`, then of
    /// each ancestor in turn, then from the top-level modules.
    pub fn resolve_reference(&self, scope: &ApiObject, name: &str) -> Option<&ApiObject> {
        let parts: Vec<&str> = name.split('.').collect();

        let mut current = Some(scope.id);
        while let Some(id) = current {
            if let Some(found) = self.walk_members(id, &parts) {
                return Some(found);
            }
            current = self.get(id).and_then(|node| return node.parent);
        }

        let (first, rest) = parts.split_first()?;
        return self
            .corpus
            .roots()
            .filter(|root| return root.name == *first)
            .find_map(|root| return self.walk_members(root.id, rest));
    }

    /// Follow `parts` down through members, taking the first member with each name.
    fn walk_members(&self, from: ObjectId, parts: &[&str]) -> Option<&ApiObject> {
        let mut node = self.get(from)?;
        for part in parts {
            node = node
                .children
                .iter()
                .filter_map(|id| return self.get(*id))
                .find(|child| return child.name == *part)?;
        }
        return Some(node);
    }
}
