//! Build scope planning.
//!
//! Before every build the engine decides how much of the program has to be
//! bundled again:
//!
//! - **Full**: nothing is known yet, or a changed module was never bundled.
//! - **Incremental**: every changed module already owns a chunk; only those
//!   modules become entries, plus the proxy of every dynamic-shape module
//!   whose proxy chunk was never emitted.
//! - **Noop**: nothing (live) changed. The host still runs a cycle, built
//!   from a single empty placeholder entry.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use stitch_graph::{ChunkRegistry, DependencyGraph, ModuleId, ResolvedId};

/// Entry name of the placeholder module used by no-op cycles.
pub const PLACEHOLDER_CHUNK_NAME: &str = "__stitch_placeholder.js";

/// Directory of proxy chunks planned by incremental builds.
pub const PROXY_CHUNK_DIR: &str = "_proxy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Full,
    Incremental,
    Noop,
}

/// Outcome of planning one build cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    pub mode: BuildMode,
    /// Chunk name → module, for incremental builds.
    pub entries: BTreeMap<String, ModuleId>,
    /// Chunk name → proxied module, for proxies emitted as extra inputs.
    pub proxies: BTreeMap<String, ModuleId>,
    /// Changed modules that are rebuilt, sorted.
    pub changed: Vec<ModuleId>,
    /// Dead modules dropped from the registry while planning.
    pub pruned: Vec<ModuleId>,
}

impl BuildPlan {
    pub fn full() -> Self {
        Self {
            mode: BuildMode::Full,
            entries: BTreeMap::new(),
            proxies: BTreeMap::new(),
            changed: Vec::new(),
            pruned: Vec::new(),
        }
    }

    pub fn noop() -> Self {
        Self {
            mode: BuildMode::Noop,
            ..Self::full()
        }
    }

    pub fn is_full(&self) -> bool {
        self.mode == BuildMode::Full
    }

    pub fn is_incremental(&self) -> bool {
        self.mode == BuildMode::Incremental
    }

    pub fn is_noop(&self) -> bool {
        self.mode == BuildMode::Noop
    }

    /// Input name planned for the proxy of `module`.
    pub fn proxy_input(&self, module: &ModuleId) -> Option<&str> {
        self.proxies
            .iter()
            .find(|(_, proxied)| *proxied == module)
            .map(|(name, _)| name.as_str())
    }

    /// Inputs the host should build with. `None` keeps the host's configured
    /// inputs (full build).
    pub fn inputs(&self) -> Option<Vec<(String, ResolvedId)>> {
        match self.mode {
            BuildMode::Full => None,
            BuildMode::Noop => Some(vec![(
                PLACEHOLDER_CHUNK_NAME.to_string(),
                ResolvedId::Placeholder,
            )]),
            BuildMode::Incremental => Some(
                self.entries
                    .iter()
                    .map(|(name, id)| (name.clone(), ResolvedId::Real(id.clone())))
                    .chain(
                        self.proxies
                            .iter()
                            .map(|(name, id)| (name.clone(), ResolvedId::Proxy(id.clone()))),
                    )
                    .collect(),
            ),
        }
    }
}

/// Decide the scope of the next build from the drained changes and
/// deletions.
///
/// Mutates the registry and graph: a full build clears both, deleted modules
/// lose their entry mark, and invalidated or deleted modules nobody imports
/// any more are pruned.
pub fn plan(
    invalidated: &FxHashSet<ModuleId>,
    deleted: &FxHashSet<ModuleId>,
    registry: &mut ChunkRegistry,
    graph: &mut DependencyGraph,
) -> BuildPlan {
    if registry.is_empty() {
        tracing::debug!("[stitch] registry empty, planning full build");
        graph.clear();
        return BuildPlan::full();
    }

    if invalidated.is_empty() && deleted.is_empty() {
        return BuildPlan::noop();
    }

    let changed: Vec<ModuleId> = invalidated
        .iter()
        .filter(|id| !deleted.contains(*id))
        .cloned()
        .collect();

    if let Some(unknown) = changed.iter().find(|id| !registry.contains(id)) {
        tracing::debug!("[stitch] {} was never bundled, planning full build", unknown);
        registry.clear();
        graph.clear();
        return BuildPlan::full();
    }

    for id in deleted {
        if graph.remove_entry(id) {
            tracing::debug!("[stitch] deleted entry {}", id);
        }
    }

    let (mut live, mut dead): (Vec<ModuleId>, Vec<ModuleId>) =
        changed.into_iter().partition(|id| graph.has_importers(id));
    live.sort();
    dead.extend(
        deleted
            .iter()
            .filter(|id| graph.contains(id) && !graph.has_importers(id))
            .cloned(),
    );

    let mut pruned = Vec::new();
    if !dead.is_empty() {
        for removed in graph.prune_orphans(dead) {
            registry.remove(&removed);
            pruned.push(removed);
        }
        pruned.sort();
        // A cascade may have taken out a changed module.
        live.retain(|id| graph.contains(id));
    }

    if live.is_empty() {
        return BuildPlan {
            pruned,
            ..BuildPlan::noop()
        };
    }

    let mut basenames: FxHashMap<&str, usize> = FxHashMap::default();
    for id in &live {
        if let Some(chunk) = registry.chunk_of(id) {
            *basenames.entry(chunk.basename()).or_default() += 1;
        }
    }

    let mut entries = BTreeMap::new();
    for id in &live {
        let Some(chunk) = registry.chunk_of(id) else {
            continue;
        };
        let name = if basenames.get(chunk.basename()).copied().unwrap_or(0) > 1 {
            chunk.file_name()
        } else {
            chunk.basename()
        };
        entries.insert(name.to_string(), id.clone());
    }

    let proxies: BTreeMap<String, ModuleId> = registry
        .shapes()
        .filter(|(_, shape)| shape.proxy_chunk.is_none())
        .filter_map(|(module, _)| {
            let chunk = registry.chunk_of(module)?;
            Some((format!("{PROXY_CHUNK_DIR}/{}", chunk.file_name()), module.clone()))
        })
        .collect();

    BuildPlan {
        mode: BuildMode::Incremental,
        entries,
        proxies,
        changed: live,
        pruned,
    }
}
