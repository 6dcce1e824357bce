//! Import rewriting during resolution.
//!
//! On an incremental build, a rebuilt module that imports an unchanged
//! neighbour must not pull the neighbour into the bundle again. The import is
//! turned into an external, relative reference to the neighbour's existing
//! chunk instead, so the neighbour's output file is left untouched.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use stitch_graph::{ChunkPath, ModuleId, ResolvedId};
use tokio::sync::watch;

use crate::engine::IncrementalEngine;
use crate::state::EngineState;
use crate::{Error, Result};

/// Answer of the resolution hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The engine has no opinion; the host resolves as usual.
    Passthrough,
    /// Bundle (or keep external) this module.
    Resolved { id: ResolvedId, external: bool },
    /// Reference an already emitted chunk by relative path.
    External { path: String },
}

/// `(specifier, importer)` of one resolution.
type ResolutionKey = (String, ResolvedId);

type OutcomeSlot = watch::Receiver<Option<ResolveOutcome>>;

tokio::task_local! {
    /// Resolutions the current task is nested inside of.
    static RESOLVING: Vec<ResolutionKey>;
}

/// Resolutions currently in progress, keyed by `(specifier, importer)`.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    active: Mutex<FxHashMap<ResolutionKey, OutcomeSlot>>,
}

pub(crate) enum Claim<'a> {
    /// First caller for the key; resolves and publishes the outcome.
    Owner(InFlightToken<'a>),
    /// The key is already being resolved elsewhere.
    Waiter(OutcomeSlot),
}

impl InFlight {
    pub(crate) fn claim(&self, key: &ResolutionKey) -> Claim<'_> {
        let mut active = self.active.lock();
        if let Some(slot) = active.get(key) {
            return Claim::Waiter(slot.clone());
        }
        let (result, slot) = watch::channel(None);
        active.insert(key.clone(), slot);
        Claim::Owner(InFlightToken {
            owner: self,
            key: key.clone(),
            result,
        })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.active.lock().len()
    }
}

/// Releases its key when dropped, on every exit path of the resolution.
/// Waiters of an unpublished token resolve on their own.
pub(crate) struct InFlightToken<'a> {
    owner: &'a InFlight,
    key: ResolutionKey,
    result: watch::Sender<Option<ResolveOutcome>>,
}

impl InFlightToken<'_> {
    pub(crate) fn publish(&self, outcome: &ResolveOutcome) {
        self.result.send_replace(Some(outcome.clone()));
    }
}

impl Drop for InFlightToken<'_> {
    fn drop(&mut self) {
        self.owner.active.lock().remove(&self.key);
    }
}

/// Outcome published for a slot, `None` if its owner gave up.
async fn wait_for_outcome(mut slot: OutcomeSlot) -> Option<ResolveOutcome> {
    match slot.wait_for(|outcome| outcome.is_some()).await {
        Ok(outcome) => (*outcome).clone(),
        Err(_) => None,
    }
}

/// What a resolution needs to know about the current cycle.
struct Scope {
    incremental: bool,
    importer_chunk: Option<ChunkPath>,
}

impl Scope {
    /// The importer is rebuilt from its previous chunk.
    fn in_rebuild(&self) -> bool {
        self.incremental && self.importer_chunk.is_some()
    }
}

/// Where the proxy of `module` lives: its emitted chunk, or the input
/// planned for it this cycle.
fn proxy_location(state: &EngineState, module: &ModuleId) -> Option<ChunkPath> {
    state
        .registry
        .shape_of(module)
        .and_then(|shape| shape.proxy_chunk.clone())
        .or_else(|| {
            state
                .session
                .as_ref()
                .and_then(|s| s.plan.proxy_input(module))
                .and_then(|name| ChunkPath::new(name).ok())
        })
}

impl IncrementalEngine {
    /// Resolution hook, called for every import the host encounters.
    ///
    /// Overlapping calls for the same `(specifier, importer)` share one
    /// resolution. A call made from inside the host's resolution of the same
    /// pair, on the same task, passes through.
    pub async fn resolve_id(
        &self,
        specifier: &str,
        importer: Option<&ResolvedId>,
    ) -> Result<ResolveOutcome> {
        if !self.is_active() {
            return Ok(ResolveOutcome::Passthrough);
        }

        let importer = match importer {
            None | Some(ResolvedId::Placeholder) => return Ok(ResolveOutcome::Passthrough),
            Some(importer) => importer,
        };
        if let ResolvedId::Proxy(module) = importer {
            if module.as_str() == specifier {
                return Ok(self.resolve_proxy_source(module));
            }
        }

        let key: ResolutionKey = (specifier.to_string(), importer.clone());
        let mut chain = RESOLVING.try_with(Vec::clone).unwrap_or_default();
        if chain.contains(&key) {
            tracing::debug!("[stitch] reentrant resolution of '{}', passing through", specifier);
            return Ok(ResolveOutcome::Passthrough);
        }
        chain.push(key.clone());

        RESOLVING.scope(chain, self.resolve_shared(key)).await
    }

    async fn resolve_shared(&self, key: ResolutionKey) -> Result<ResolveOutcome> {
        loop {
            match self.in_flight.claim(&key) {
                Claim::Owner(token) => {
                    let outcome = self.resolve_claimed(&key.0, &key.1).await?;
                    token.publish(&outcome);
                    return Ok(outcome);
                }
                Claim::Waiter(slot) => {
                    if let Some(outcome) = wait_for_outcome(slot).await {
                        return Ok(outcome);
                    }
                    tracing::debug!("[stitch] shared resolution of '{}' failed, retrying", key.0);
                }
            }
        }
    }

    /// A proxy importing the module it wraps. Once the module owns a chunk
    /// and the proxy's location is known, an incremental build references
    /// that chunk instead of bundling the module again.
    fn resolve_proxy_source(&self, module: &ModuleId) -> ResolveOutcome {
        let state = self.state.lock();
        let incremental = state
            .session
            .as_ref()
            .is_some_and(|s| s.plan.is_incremental());
        if incremental {
            if let (Some(chunk), Some(proxy)) =
                (state.registry.chunk_of(module), proxy_location(&state, module))
            {
                return ResolveOutcome::External {
                    path: chunk.relative_from(&proxy),
                };
            }
        }
        real(module.clone())
    }

    async fn resolve_claimed(
        &self,
        specifier: &str,
        importer: &ResolvedId,
    ) -> Result<ResolveOutcome> {
        let Some(importer_module) = importer.module() else {
            return Ok(ResolveOutcome::Passthrough);
        };

        let scope = {
            let state = self.state.lock();
            Scope {
                incremental: state
                    .session
                    .as_ref()
                    .is_some_and(|s| s.plan.is_incremental()),
                importer_chunk: state.registry.chunk_of(importer_module).cloned(),
            }
        };

        let resolution = match self.host.resolve(specifier, importer_module).await? {
            Some(resolution) => resolution,
            None if scope.in_rebuild() => {
                return Err(Error::Resolution {
                    specifier: specifier.to_string(),
                    importer: importer_module.clone(),
                });
            }
            None => return Ok(ResolveOutcome::Passthrough),
        };

        if resolution.external {
            return Ok(ResolveOutcome::Resolved {
                id: ResolvedId::Real(resolution.id),
                external: true,
            });
        }

        let target = resolution.id;
        if importer.is_proxy() {
            return Ok(real(target));
        }

        enum Known {
            Shape(Option<ChunkPath>),
            Chunk(ChunkPath),
            Unknown,
        }

        let known = {
            let mut state = self.state.lock();
            let proxy = proxy_location(&state, &target);
            let shape = state.registry.shape_of(&target).is_some();
            let chunk = state.registry.chunk_of(&target).cloned();
            let Some(session) = state.session_mut() else {
                return Ok(ResolveOutcome::Passthrough);
            };
            session.record_import(importer_module, &target);

            if shape {
                Known::Shape(proxy)
            } else if session.pending_shapes.contains_key(&target) {
                Known::Shape(None)
            } else {
                match chunk {
                    Some(chunk) => Known::Chunk(chunk),
                    None => Known::Unknown,
                }
            }
        };

        let outcome = match known {
            Known::Shape(proxy_chunk) => match (&scope.importer_chunk, proxy_chunk) {
                (Some(from), Some(proxy)) if scope.incremental => ResolveOutcome::External {
                    path: proxy.relative_from(from),
                },
                _ => proxied(target.clone()),
            },
            Known::Chunk(chunk) => match &scope.importer_chunk {
                Some(from) if scope.incremental => ResolveOutcome::External {
                    path: chunk.relative_from(from),
                },
                _ => real(target.clone()),
            },
            Known::Unknown => {
                let info = self.host.export_info(&target).await?;
                if info.needs_proxy() {
                    let mut state = self.state.lock();
                    if let Some(session) = state.session_mut() {
                        session
                            .pending_shapes
                            .entry(target.clone())
                            .or_insert_with(|| info.to_shape());
                    }
                    proxied(target.clone())
                } else {
                    real(target.clone())
                }
            }
        };

        tracing::debug!("[stitch] {} -> {}: {:?}", importer_module, target, outcome);
        Ok(outcome)
    }
}

fn proxied(target: ModuleId) -> ResolveOutcome {
    ResolveOutcome::Resolved {
        id: ResolvedId::Proxy(target),
        external: false,
    }
}

fn real(target: ModuleId) -> ResolveOutcome {
    ResolveOutcome::Resolved {
        id: ResolvedId::Real(target),
        external: false,
    }
}
