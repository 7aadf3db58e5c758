//! Per-document scope tables declared with scope tags.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::types::ObjectId;

/// One document's declared scope: object name to object, in first-declaration
/// order. Re-declaring a name replaces its object but keeps its position, so
/// fallback candidates are always visited in a reproducible order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScopeTable {
    entries: Vec<(String, ObjectId)>,
}

impl ScopeTable {
    /// Record `object` under `name`; the last declaration for a name wins.
    pub fn declare(&mut self, name: &str, object: ObjectId) {
        match self.entries.iter_mut().find(|(existing, _)| return existing == name) {
            Some(entry) => entry.1 = object,
            None => self.entries.push((name.to_string(), object)),
        }
    }

    /// Declared `(name, object)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, ObjectId)> {
        return self.entries.iter().map(|(name, id)| return (name.as_str(), *id));
    }
}

/// Scope tables for every document in one processing pass. Object handles
/// refer to the resolution suite of that pass; a rerun starts from a new tracker.
#[derive(Debug, Default)]
pub struct ScopeTracker {
    tables: HashMap<PathBuf, ScopeTable>,
}

impl ScopeTracker {
    /// Record `object` under `name` in `document`'s table.
    pub fn declare(&mut self, document: &Path, name: &str, object: ObjectId) {
        self.table_mut(document).declare(name, object);
    }

    /// The document's table, created empty on first use.
    fn table_mut(&mut self, document: &Path) -> &mut ScopeTable {
        return self.tables.entry(document.to_path_buf()).or_default();
    }

    /// The document's table, if anything was declared for it.
    pub fn scoped_objects(&self, document: &Path) -> Option<&ScopeTable> {
        return self.tables.get(document);
    }
}
