//! Post-build update of the registry and the dependency graph.
//!
//! Runs once per cycle with the manifest of the finished bundle. All checks
//! happen before the first mutation, so a rejected bundle leaves the engine
//! exactly as it was after planning.

use rustc_hash::{FxHashMap, FxHashSet};
use stitch_graph::{ChunkPath, ExportShape, ModuleId, ResolvedId};

use crate::engine::IncrementalEngine;
use crate::manifest::{BundleManifest, ManifestChunk};
use crate::{ConfigurationError, Error, Result};

/// Summary of one finalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Modules (re)registered from this bundle.
    pub registered: usize,
    /// Modules dropped because nothing reaches them any more.
    pub pruned: Vec<ModuleId>,
    /// Proxy records committed or refreshed.
    pub proxies: usize,
}

/// A tracked chunk with its single module.
struct Tracked<'a> {
    module: ModuleId,
    path: ChunkPath,
    chunk: &'a ManifestChunk,
}

impl IncrementalEngine {
    /// Register the output of a successful build.
    ///
    /// Any error re-queues the changes of this cycle.
    pub async fn finalize(&self, manifest: &BundleManifest) -> Result<FinalizeReport> {
        if !self.is_active() {
            return Ok(FinalizeReport::default());
        }

        let result = self.apply_manifest(manifest).await;
        if let Err(e) = &result {
            if self.state.lock().requeue_session() {
                tracing::warn!("[stitch] finalization failed, re-queueing changes: {}", e);
            }
        }
        result
    }

    async fn apply_manifest(&self, manifest: &BundleManifest) -> Result<FinalizeReport> {
        let tracked = collect_tracked(manifest)?;
        let proxy_chunks = collect_proxy_chunks(manifest)?;

        let (full, imports) = {
            let state = self.state.lock();
            let Some(session) = state.session.as_ref() else {
                return Err(Error::GraphInconsistency(
                    "bundle finalized without a planned build".to_string(),
                ));
            };
            if session.finalized {
                return Err(ConfigurationError::MultipleOutputs { count: 2 }.into());
            }

            if session.plan.is_incremental() {
                for (name, entry) in &session.plan.entries {
                    if !tracked.iter().any(|t| &t.module == entry) {
                        return Err(Error::GraphInconsistency(format!(
                            "planned entry '{name}' ({entry}) is missing from the bundle"
                        )));
                    }
                }
                for (name, proxied) in &session.plan.proxies {
                    if !proxy_chunks.contains_key(proxied) {
                        return Err(Error::GraphInconsistency(format!(
                            "planned proxy '{name}' ({proxied}) is missing from the bundle"
                        )));
                    }
                }
            }

            for t in &tracked {
                if let Some(owner) = state.registry.owner_of(&t.path) {
                    if owner != &t.module {
                        return Err(Error::GraphInconsistency(format!(
                            "chunk {} belongs to {owner}, but the bundle assigns it to {}",
                            t.path, t.module
                        )));
                    }
                }
            }

            (session.plan.is_full(), session.imports.clone())
        };

        let mut shapes: Vec<Option<ExportShape>> = Vec::with_capacity(tracked.len());
        for t in &tracked {
            let info = self.host.export_info(&t.module).await?;
            shapes.push(
                info.needs_proxy()
                    .then(|| ExportShape::new(t.chunk.has_default_export(), info.synthetic_exports)),
            );
        }

        let mut state = self.state.lock();
        let state = &mut *state;

        let owned: FxHashSet<&ModuleId> = tracked.iter().map(|t| &t.module).collect();
        for t in &tracked {
            state.registry.insert(t.module.clone(), t.path.clone())?;
            state.graph.add_module(t.module.clone());
            if full && t.chunk.is_entry {
                state.graph.add_entry(t.module.clone());
            }
        }

        for t in &tracked {
            let targets: Vec<ModuleId> = imports
                .get(&t.module)
                .map(|targets| {
                    targets
                        .iter()
                        .filter(|target| owned.contains(target) || state.registry.contains(target))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            let diff = state.graph.set_imports(&t.module, targets);
            if !diff.is_empty() {
                tracing::debug!(
                    "[stitch] imports of {}: +{} -{}",
                    t.module,
                    diff.added.len(),
                    diff.removed.len()
                );
            }
        }

        let mut proxies = 0;
        for (t, shape) in tracked.iter().zip(shapes) {
            match shape {
                Some(mut shape) => {
                    shape.proxy_chunk = proxy_chunks.get(&t.module).cloned().or_else(|| {
                        state
                            .registry
                            .shape_of(&t.module)
                            .and_then(|existing| existing.proxy_chunk.clone())
                    });
                    state.registry.set_shape(&t.module, shape);
                    proxies += 1;
                }
                None => {
                    state.registry.clear_shape(&t.module);
                }
            }
        }

        for (module, path) in &proxy_chunks {
            if owned.contains(module) {
                continue;
            }
            if let Some(mut shape) = state.registry.shape_of(module).cloned() {
                shape.proxy_chunk = Some(path.clone());
                state.registry.set_shape(module, shape);
                proxies += 1;
            }
        }

        let pruned = state.graph.prune_unreachable();
        for module in &pruned {
            state.registry.remove(module);
            tracing::debug!("[stitch] pruned {}", module);
        }

        debug_assert!(state.graph.is_consistent());

        if let Some(session) = state.session.as_mut() {
            session.finalized = true;
        }

        tracing::info!(
            "[stitch] registered {} chunks, pruned {}, {} proxies",
            tracked.len(),
            pruned.len(),
            proxies
        );

        Ok(FinalizeReport {
            registered: tracked.len(),
            pruned,
            proxies,
        })
    }
}

/// Tracked chunks of the manifest, each with exactly one real module.
fn collect_tracked(manifest: &BundleManifest) -> Result<Vec<Tracked<'_>>> {
    let mut tracked = Vec::new();
    for chunk in manifest.chunks.iter().filter(|c| !c.is_untracked()) {
        let module = match chunk.modules.as_slice() {
            [ResolvedId::Real(module)] => module.clone(),
            modules => {
                return Err(ConfigurationError::ChunkCardinality {
                    chunk: chunk.file_name.clone(),
                    modules: modules.len(),
                }
                .into());
            }
        };
        tracked.push(Tracked {
            module,
            path: ChunkPath::new(&chunk.file_name)?,
            chunk,
        });
    }
    Ok(tracked)
}

/// Proxy chunks of the manifest, by proxied module.
fn collect_proxy_chunks(manifest: &BundleManifest) -> Result<FxHashMap<ModuleId, ChunkPath>> {
    let mut proxies = FxHashMap::default();
    for chunk in &manifest.chunks {
        if let [ResolvedId::Proxy(module)] = chunk.modules.as_slice() {
            proxies.insert(module.clone(), ChunkPath::new(&chunk.file_name)?);
        }
    }
    Ok(proxies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestChunk;

    #[test]
    fn test_cardinality() {
        let manifest = BundleManifest::new(vec![
            ManifestChunk::single("a.js", ModuleId::new("/a.js")),
            ManifestChunk::single("ab.js", ModuleId::new("/a.js"))
                .with_modules(vec![ModuleId::new("/a.js").into(), ModuleId::new("/b.js").into()]),
        ]);

        match collect_tracked(&manifest) {
            Err(Error::Configuration(ConfigurationError::ChunkCardinality { chunk, modules })) => {
                assert_eq!(chunk, "ab.js");
                assert_eq!(modules, 2);
            }
            other => panic!("expected cardinality error, got {:?}", other.map(|t| t.len())),
        }
    }

    #[test]
    fn test_assets_and_proxies_are_skipped() {
        let manifest = BundleManifest::new(vec![
            ManifestChunk::asset("style.css"),
            ManifestChunk::single("_proxy/a.js", ResolvedId::Proxy(ModuleId::new("/a.js"))),
            ManifestChunk::single("a.js", ModuleId::new("/a.js")),
        ]);

        let tracked = collect_tracked(&manifest).unwrap();
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].path.as_str(), "/a.js");

        let proxies = collect_proxy_chunks(&manifest).unwrap();
        assert_eq!(
            proxies.get(&ModuleId::new("/a.js")).map(ChunkPath::as_str),
            Some("/_proxy/a.js")
        );
    }

    #[test]
    fn test_empty_chunk_is_a_cardinality_error() {
        let manifest = BundleManifest::new(vec![
            ManifestChunk::single("empty.js", ModuleId::new("/a.js")).with_modules(Vec::new()),
        ]);
        assert!(matches!(
            collect_tracked(&manifest),
            Err(Error::Configuration(ConfigurationError::ChunkCardinality { modules: 0, .. }))
        ));
    }
}
