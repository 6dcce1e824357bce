//! Query methods for DependencyGraph.

use rustc_hash::FxHashSet;

use super::{DependencyGraph, Importer};
use crate::ModuleId;

impl DependencyGraph {
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.importers.contains_key(id)
    }

    /// Whether anything (including the entry pseudo-importer) still imports `id`.
    pub fn has_importers(&self, id: &ModuleId) -> bool {
        self.importers.get(id).is_some_and(|set| !set.is_empty())
    }

    pub fn is_entry(&self, id: &ModuleId) -> bool {
        self.importers
            .get(id)
            .is_some_and(|set| set.contains(&Importer::Entry))
    }

    /// All importers of `id`, sorted.
    pub fn importers_of(&self, id: &ModuleId) -> Vec<Importer> {
        let mut importers: Vec<Importer> = self
            .importers
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        importers.sort();
        importers
    }

    /// Modules importing `id`, excluding the entry pseudo-importer, sorted.
    pub fn module_importers_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        let mut modules: Vec<ModuleId> = self
            .importers
            .get(id)
            .map(|set| set.iter().filter_map(Importer::as_module).cloned().collect())
            .unwrap_or_default();
        modules.sort();
        modules
    }

    /// Direct dependencies of `id`, sorted.
    pub fn imports_of(&self, id: &ModuleId) -> Vec<ModuleId> {
        let mut deps: Vec<ModuleId> = self
            .imported
            .get(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        deps.sort();
        deps
    }

    pub fn entries(&self) -> Vec<ModuleId> {
        let mut entries: Vec<ModuleId> = self
            .importers
            .iter()
            .filter(|(_, set)| set.contains(&Importer::Entry))
            .map(|(id, _)| id.clone())
            .collect();
        entries.sort();
        entries
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.importers.keys()
    }

    /// Every module reachable from an entry point (entries included).
    pub fn reachable_from_entries(&self) -> FxHashSet<ModuleId> {
        let mut seen: FxHashSet<ModuleId> = FxHashSet::default();
        let mut stack = self.entries();

        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(deps) = self.imported.get(&id) {
                stack.extend(deps.iter().filter(|dep| !seen.contains(*dep)).cloned());
            }
        }

        seen
    }

    /// Check that both edge maps are exact inverses of each other.
    pub fn is_consistent(&self) -> bool {
        let forward_ok = self.imported.iter().all(|(from, deps)| {
            self.importers.contains_key(from)
                && deps.iter().all(|to| {
                    self.importers
                        .get(to)
                        .is_some_and(|set| set.contains(&Importer::Module(from.clone())))
                })
        });

        let backward_ok = self.importers.iter().all(|(to, set)| {
            set.iter().filter_map(Importer::as_module).all(|from| {
                self.imported
                    .get(from)
                    .is_some_and(|deps| deps.contains(to))
            })
        });

        forward_ok && backward_ok
    }
}
