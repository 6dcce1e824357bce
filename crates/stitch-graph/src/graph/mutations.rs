//! Mutation methods for DependencyGraph.

use rustc_hash::FxHashSet;

use super::{DependencyGraph, ImportDiff, Importer};
use crate::ModuleId;

impl DependencyGraph {
    /// Register a module without changing any edge.
    pub fn add_module(&mut self, id: ModuleId) {
        self.importers.entry(id).or_default();
    }

    /// Mark a module as a build entry point.
    ///
    /// Returns `false` if it already was one.
    pub fn add_entry(&mut self, id: ModuleId) -> bool {
        self.importers.entry(id).or_default().insert(Importer::Entry)
    }

    pub fn remove_entry(&mut self, id: &ModuleId) -> bool {
        self.importers
            .get_mut(id)
            .is_some_and(|importers| importers.remove(&Importer::Entry))
    }

    /// Replace the import set of `id`, adjusting the reverse edges of every
    /// dependency that was added or dropped.
    ///
    /// Targets that lose their last importer stay in the graph; pruning them
    /// is a separate step (see [`DependencyGraph::prune_orphans`]).
    pub fn set_imports<I>(&mut self, id: &ModuleId, targets: I) -> ImportDiff
    where
        I: IntoIterator<Item = ModuleId>,
    {
        let next: FxHashSet<ModuleId> = targets.into_iter().collect();
        let previous = self.imported.remove(id).unwrap_or_default();
        self.importers.entry(id.clone()).or_default();

        let mut diff = ImportDiff::default();
        let importer = Importer::Module(id.clone());

        for removed in previous.difference(&next) {
            if let Some(importers) = self.importers.get_mut(removed) {
                importers.remove(&importer);
            }
            diff.removed.push(removed.clone());
        }

        for added in next.difference(&previous) {
            self.importers
                .entry(added.clone())
                .or_default()
                .insert(importer.clone());
            diff.added.push(added.clone());
        }

        diff.added.sort();
        diff.removed.sort();

        if !next.is_empty() {
            self.imported.insert(id.clone(), next);
        }

        diff
    }

    /// Remove a module and its outgoing edges.
    ///
    /// This is the second half of pruning and only succeeds once the module
    /// has no importers left; returns the dependencies that lost an importer.
    pub fn remove_module(&mut self, id: &ModuleId) -> Option<Vec<ModuleId>> {
        if self.has_importers(id) {
            return None;
        }

        self.importers.remove(id)?;
        let importer = Importer::Module(id.clone());
        let mut released: Vec<ModuleId> = self
            .imported
            .remove(id)
            .unwrap_or_default()
            .into_iter()
            .collect();

        for dep in &released {
            if let Some(importers) = self.importers.get_mut(dep) {
                importers.remove(&importer);
            }
        }

        released.sort();
        Some(released)
    }

    /// Prune every candidate that has no importer, cascading into the
    /// dependencies it was the last importer of.
    ///
    /// Returns the removed modules in removal order.
    pub fn prune_orphans<I>(&mut self, candidates: I) -> Vec<ModuleId>
    where
        I: IntoIterator<Item = ModuleId>,
    {
        let mut pending: Vec<ModuleId> = candidates.into_iter().collect();
        let mut removed = Vec::new();

        while let Some(id) = pending.pop() {
            if let Some(released) = self.remove_module(&id) {
                removed.push(id);
                pending.extend(released);
            }
        }

        removed
    }

    /// Remove every module that cannot be reached from an entry point,
    /// including import cycles that only reference each other.
    pub fn prune_unreachable(&mut self) -> Vec<ModuleId> {
        let reachable = self.reachable_from_entries();
        let mut unreachable: Vec<ModuleId> = self
            .importers
            .keys()
            .filter(|id| !reachable.contains(*id))
            .cloned()
            .collect();
        unreachable.sort();

        // Cut incoming edges first so cycle members become orphans.
        for id in &unreachable {
            if let Some(importers) = self.importers.get_mut(id) {
                importers.clear();
            }
        }

        let mut removed = Vec::with_capacity(unreachable.len());
        for id in unreachable {
            if self.remove_module(&id).is_some() {
                removed.push(id);
            }
        }
        removed
    }
}
