//! Importer/imported adjacency for the modules of a watch session.
//!
//! The graph is split across files the same way the methods are grouped:
//!
//! - [`mutations`] - entry marking, import diffs, pruning
//! - [`queries`] - lookups and reachability

mod mutations;
mod queries;

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::ModuleId;

/// Something that imports a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Importer {
    /// Pseudo-importer marking a configured build entry point.
    Entry,
    Module(ModuleId),
}

impl Importer {
    pub fn as_module(&self) -> Option<&ModuleId> {
        match self {
            Importer::Entry => None,
            Importer::Module(id) => Some(id),
        }
    }
}

impl fmt::Display for Importer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Importer::Entry => f.write_str("<entry>"),
            Importer::Module(id) => write!(f, "{id}"),
        }
    }
}

/// Edges added and removed by one [`DependencyGraph::set_imports`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportDiff {
    pub added: Vec<ModuleId>,
    pub removed: Vec<ModuleId>,
}

impl ImportDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Dependency graph with both edge directions stored explicitly.
///
/// Invariant: `b ∈ imported[a]` iff `Module(a) ∈ importers[b]`. Every module
/// known to the graph has an `importers` entry, possibly empty.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    pub(crate) importers: FxHashMap<ModuleId, FxHashSet<Importer>>,
    pub(crate) imported: FxHashMap<ModuleId, FxHashSet<ModuleId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of modules known to the graph.
    pub fn len(&self) -> usize {
        self.importers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.importers.is_empty()
    }

    pub fn clear(&mut self) {
        self.importers.clear();
        self.imported.clear();
    }
}
