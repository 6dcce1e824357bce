//! Engine state shared by all hooks.

use rustc_hash::{FxHashMap, FxHashSet};
use stitch_graph::{ChunkRegistry, DependencyGraph, ExportShape, ModuleId};

use crate::invalidation::InvalidationTracker;
use crate::planner::BuildPlan;

/// Everything that outlives a single hook call.
#[derive(Debug, Default)]
pub(crate) struct EngineState {
    pub registry: ChunkRegistry,
    pub graph: DependencyGraph,
    pub invalidation: InvalidationTracker,
    /// The build cycle in progress, from planning until the next plan.
    pub session: Option<BuildSession>,
}

impl EngineState {
    pub fn session_mut(&mut self) -> Option<&mut BuildSession> {
        self.session.as_mut()
    }

    /// Give the invalidations of the current cycle back to the tracker,
    /// unless they were already given back or the cycle succeeded.
    pub fn requeue_session(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if session.finalized || session.requeued {
            return false;
        }
        session.requeued = true;
        self.invalidation.requeue(session.drained.iter().cloned());
        true
    }
}

/// Per-cycle bookkeeping.
#[derive(Debug)]
pub(crate) struct BuildSession {
    pub plan: BuildPlan,
    /// Invalidations consumed by planning this cycle.
    pub drained: FxHashSet<ModuleId>,
    /// Import edges observed during resolution.
    pub imports: FxHashMap<ModuleId, FxHashSet<ModuleId>>,
    /// Export shapes discovered during resolution, not yet committed.
    pub pending_shapes: FxHashMap<ModuleId, ExportShape>,
    pub finalized: bool,
    pub requeued: bool,
}

impl BuildSession {
    pub fn new(plan: BuildPlan, drained: FxHashSet<ModuleId>) -> Self {
        Self {
            plan,
            drained,
            imports: FxHashMap::default(),
            pending_shapes: FxHashMap::default(),
            finalized: false,
            requeued: false,
        }
    }

    pub fn record_import(&mut self, importer: &ModuleId, target: &ModuleId) {
        self.imports
            .entry(importer.clone())
            .or_default()
            .insert(target.clone());
    }
}
