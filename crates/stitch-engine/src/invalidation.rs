//! Change accumulation between builds.

use std::str::FromStr;

use rustc_hash::FxHashSet;
use stitch_graph::{DependencyGraph, ModuleId};

/// File system event reported by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchEvent {
    Create,
    Update,
    Delete,
}

impl FromStr for WatchEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(WatchEvent::Create),
            "update" => Ok(WatchEvent::Update),
            "delete" => Ok(WatchEvent::Delete),
            other => Err(format!("Invalid watch event: {}", other)),
        }
    }
}

/// Modules that changed or disappeared since the last build was planned.
#[derive(Debug, Clone, Default)]
pub struct InvalidationTracker {
    invalidated: FxHashSet<ModuleId>,
    deleted: FxHashSet<ModuleId>,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a watcher event. Create and update are both plain changes.
    pub fn notify(&mut self, id: ModuleId, event: WatchEvent, graph: &DependencyGraph) {
        match event {
            WatchEvent::Create | WatchEvent::Update => self.notify_changed(id),
            WatchEvent::Delete => self.notify_deleted(&id, graph),
        }
    }

    pub fn notify_changed(&mut self, id: ModuleId) {
        tracing::debug!("[stitch] invalidated: {}", id);
        self.deleted.remove(&id);
        self.invalidated.insert(id);
    }

    /// A deleted module invalidates its module importers, which have to be
    /// rebuilt without it. The module itself is not invalidated; it is
    /// remembered as deleted so planning can drop its entry mark.
    pub fn notify_deleted(&mut self, id: &ModuleId, graph: &DependencyGraph) {
        let importers = graph.module_importers_of(id);
        tracing::debug!(
            "[stitch] deleted: {} (invalidating {} importers)",
            id,
            importers.len()
        );
        self.invalidated.extend(importers);
        if graph.contains(id) {
            self.deleted.insert(id.clone());
        }
    }

    /// Take the invalidated set, leaving it empty.
    pub fn drain(&mut self) -> FxHashSet<ModuleId> {
        std::mem::take(&mut self.invalidated)
    }

    /// Take the deleted set, leaving it empty.
    pub fn drain_deleted(&mut self) -> FxHashSet<ModuleId> {
        std::mem::take(&mut self.deleted)
    }

    pub fn is_deleted(&self, id: &ModuleId) -> bool {
        self.deleted.contains(id)
    }

    /// Put back a drained set after a failed build.
    pub fn requeue<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = ModuleId>,
    {
        self.invalidated.extend(ids);
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.invalidated.contains(id)
    }

    pub fn len(&self) -> usize {
        self.invalidated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invalidated.is_empty()
    }

    /// Pending ids, sorted.
    pub fn pending(&self) -> Vec<ModuleId> {
        let mut ids: Vec<_> = self.invalidated.iter().cloned().collect();
        ids.sort();
        ids
    }
}
