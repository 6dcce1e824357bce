//! The engine handle and its lifecycle hooks.
//!
//! Resolution, loading and finalization live in their own modules
//! ([`rewriter`](crate::rewriter), [`proxy`](crate::proxy),
//! [`finalize`](crate::finalize)) as further `impl IncrementalEngine` blocks.

use std::sync::Arc;

use parking_lot::Mutex;
use stitch_graph::{ChunkRegistry, DependencyGraph, ModuleId};

use crate::config::{EngineConfig, OutputOptions, PipelineConfig};
use crate::host::ModuleHost;
use crate::invalidation::WatchEvent;
use crate::planner::{self, BuildPlan};
use crate::rewriter::InFlight;
use crate::state::{BuildSession, EngineState};
use crate::validation::validate_pipeline;
use crate::Result;

/// What the host has to do at build start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStart {
    /// Files to keep watching even though they are not part of this build.
    pub watch_files: Vec<ModuleId>,
}

/// Incremental rebuild engine.
///
/// One instance lives for a whole watch session and is shared with the host
/// behind an `Arc`. All state sits behind a single mutex that is only taken
/// for short, synchronous sections; it is never held across host calls.
pub struct IncrementalEngine {
    pub(crate) config: EngineConfig,
    pub(crate) host: Arc<dyn ModuleHost>,
    pub(crate) state: Mutex<EngineState>,
    pub(crate) in_flight: InFlight,
}

impl std::fmt::Debug for IncrementalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IncrementalEngine")
            .field("config", &self.config)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl IncrementalEngine {
    pub fn new(config: EngineConfig, host: Arc<dyn ModuleHost>) -> Self {
        Self {
            config,
            host,
            state: Mutex::new(EngineState::default()),
            in_flight: InFlight::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn is_active(&self) -> bool {
        self.config.watch_mode
    }

    /// Record a watcher event.
    pub fn notify(&self, id: ModuleId, event: WatchEvent) {
        if !self.is_active() {
            return;
        }
        let mut state = self.state.lock();
        let EngineState {
            invalidation,
            graph,
            ..
        } = &mut *state;
        invalidation.notify(id, event, graph);
    }

    pub fn notify_changed(&self, id: ModuleId) {
        self.notify(id, WatchEvent::Update);
    }

    pub fn notify_deleted(&self, id: ModuleId) {
        self.notify(id, WatchEvent::Delete);
    }

    /// Plan the next build cycle. Consumes the pending invalidations and
    /// deletions.
    pub fn plan_build(&self) -> BuildPlan {
        if !self.is_active() {
            return BuildPlan::full();
        }

        let mut state = self.state.lock();
        if state.requeue_session() {
            tracing::warn!("[stitch] previous build never finished, re-queueing its changes");
        }

        let mut drained = state.invalidation.drain();
        let deleted = state.invalidation.drain_deleted();
        let EngineState {
            registry, graph, ..
        } = &mut *state;
        let plan = planner::plan(&drained, &deleted, registry, graph);
        // Pruned modules are gone for good and must not come back on requeue.
        for module in &plan.pruned {
            drained.remove(module);
        }

        tracing::info!(
            "[stitch] planned {:?} build ({} changed, {} pruned)",
            plan.mode,
            plan.changed.len(),
            plan.pruned.len()
        );

        state.session = Some(BuildSession::new(plan.clone(), drained));
        plan
    }

    /// Validate the host pipeline and collect the files to keep watching.
    pub fn build_start(&self, pipeline: &PipelineConfig) -> Result<BuildStart> {
        if !self.is_active() {
            return Ok(BuildStart::default());
        }

        validate_pipeline(&self.config, pipeline)?;

        let state = self.state.lock();
        let incremental = state
            .session
            .as_ref()
            .is_some_and(|s| s.plan.is_incremental());
        if !incremental {
            return Ok(BuildStart::default());
        }

        let mut watch_files: Vec<ModuleId> = state
            .registry
            .modules()
            .filter(|id| !id.is_virtual())
            .cloned()
            .collect();
        watch_files.sort();

        Ok(BuildStart { watch_files })
    }

    /// Output options to apply for the current cycle.
    pub fn output_options(&self) -> OutputOptions {
        if self.is_active() && self.is_incremental_build() {
            OutputOptions {
                entry_file_names: Some(self.config.incremental_entry_file_names.clone()),
            }
        } else {
            OutputOptions::default()
        }
    }

    /// End of the module phase. A failed build gives its changes back so the
    /// next cycle retries them.
    pub fn build_end(&self, error: Option<&(dyn std::error::Error + 'static)>) {
        if !self.is_active() {
            return;
        }
        let Some(error) = error else {
            return;
        };

        let mut state = self.state.lock();
        if state.requeue_session() {
            tracing::warn!("[stitch] build failed, re-queueing changes: {}", error);
        }
    }

    pub fn is_incremental_build(&self) -> bool {
        self.state
            .lock()
            .session
            .as_ref()
            .is_some_and(|s| s.plan.is_incremental())
    }

    /// Modules rebuilt by the current cycle, if it is incremental.
    pub fn changed_modules(&self) -> Option<Vec<ModuleId>> {
        self.state
            .lock()
            .session
            .as_ref()
            .filter(|s| s.plan.is_incremental())
            .map(|s| s.plan.changed.clone())
    }

    /// Invalidations waiting for the next plan, sorted.
    pub fn pending_invalidations(&self) -> Vec<ModuleId> {
        self.state.lock().invalidation.pending()
    }

    /// Snapshot of the chunk registry.
    pub fn registry(&self) -> ChunkRegistry {
        self.state.lock().registry.clone()
    }

    /// Snapshot of the dependency graph.
    pub fn graph(&self) -> DependencyGraph {
        self.state.lock().graph.clone()
    }
}
