#![cfg_attr(docsrs, feature(doc_cfg))]

//! # stitch-engine
//!
//! Incremental rebuilds for watch-mode bundlers.
//!
//! After a first full build, the engine keeps track of which module produced
//! which output chunk. When the watcher reports changes, the next build only
//! re-bundles the changed modules; imports of unchanged neighbours are
//! rewritten to relative references to their previously emitted chunks, so
//! those files stay byte-identical on disk.
//!
//! The bundler itself is a collaborator. It talks to the engine through a
//! handful of hooks, called in this order for every build cycle:
//!
//! | Hook | When | Purpose |
//! |------|------|---------|
//! | [`IncrementalEngine::plan_build`] | before the build | full / incremental / no-op decision and entry map |
//! | [`IncrementalEngine::build_start`] | build start | pipeline validation, watch files |
//! | [`IncrementalEngine::resolve_id`] | every import | rewrite imports of unchanged modules |
//! | [`IncrementalEngine::load`] | every module | synthesize proxy and placeholder modules |
//! | [`IncrementalEngine::build_end`] | build end | re-queue changes of a failed build |
//! | [`IncrementalEngine::output_options`] | before output | stable entry file names |
//! | [`IncrementalEngine::finalize`] | bundle written | registry and graph update |
//!
//! Change notifications from the watcher arrive at any time through
//! [`IncrementalEngine::notify`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use stitch_engine::{EngineConfig, IncrementalEngine, ModuleHost, WatchEvent};
//! use stitch_graph::ModuleId;
//!
//! # async fn example(host: Arc<dyn ModuleHost>) -> stitch_engine::Result<()> {
//! let engine = IncrementalEngine::new(EngineConfig::default(), host);
//!
//! // First cycle: nothing is known yet, so the plan is a full build.
//! let plan = engine.plan_build();
//! assert!(plan.is_full());
//!
//! // ... the bundler runs, calling resolve_id/load, then finalize(&manifest) ...
//!
//! engine.notify(ModuleId::new("/src/dep.js"), WatchEvent::Update);
//! let plan = engine.plan_build();
//! # Ok(()) }
//! ```

pub mod config;
pub mod engine;
pub mod finalize;
pub mod host;
pub mod invalidation;
pub mod manifest;
pub mod planner;
pub mod proxy;
pub mod rewriter;
mod state;
pub mod validation;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use config::{EngineConfig, OutputOptions, PipelineConfig};
pub use engine::{BuildStart, IncrementalEngine};
pub use finalize::FinalizeReport;
pub use host::{ExportInfo, HostError, HostResolution, HostResult, ModuleHost};
pub use invalidation::{InvalidationTracker, WatchEvent};
pub use manifest::{BundleManifest, ChunkKind, ManifestChunk};
pub use planner::{BuildMode, BuildPlan, PLACEHOLDER_CHUNK_NAME, PROXY_CHUNK_DIR};
pub use proxy::{LoadOutput, PROXY_NAMESPACE_EXPORT};
pub use rewriter::ResolveOutcome;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

// Re-export the foundation types that appear in the hook signatures
pub use stitch_graph::{
    ChunkPath, ChunkRegistry, DependencyGraph, ExportShape, Importer, ModuleId, ResolvedId,
    SyntheticExports,
};

/// Pipeline setups the engine cannot work with.
///
/// All of these are fatal: the build is aborted and the user has to fix the
/// bundler configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// The engine is not the first plugin of the pipeline.
    #[error("'{expected}' must be the first plugin, but '{found}' comes first")]
    PluginOrder { expected: String, found: String },

    /// The engine is registered more than once.
    #[error("'{name}' is registered {count} times, it must be registered exactly once")]
    DuplicateRegistration { name: String, count: usize },

    /// Tree shaking would break the 1:1 module ↔ chunk mapping.
    #[error("tree shaking must be disabled for incremental building")]
    TreeShakingEnabled,

    /// Modules are merged into shared chunks.
    #[error("preserve_modules must be enabled for incremental building")]
    PreserveModulesDisabled,

    /// More than one output target in a single build.
    #[error("multiple outputs are not supported (found {count})")]
    MultipleOutputs { count: usize },

    /// An emitted chunk does not contain exactly one module.
    #[error("chunk '{chunk}' must contain exactly one module, found {modules}")]
    ChunkCardinality { chunk: String, modules: usize },
}

/// Error types for stitch-engine operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Incompatible bundler configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),

    /// An import of a rebuilt module cannot be resolved.
    #[error("Cannot resolve '{specifier}' imported by '{importer}'")]
    Resolution {
        specifier: String,
        importer: ModuleId,
    },

    /// Registry, graph and bundle output disagree.
    #[error("Graph inconsistency: {0}")]
    GraphInconsistency(String),

    /// Error from the foundation crate.
    #[error("Graph error: {0}")]
    Graph(#[from] stitch_graph::Error),

    /// Error reported by the host bundler.
    #[error("Host error: {0}")]
    Host(#[from] HostError),
}

/// Result type alias for stitch-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Configuration(ConfigurationError::PluginOrder { .. }) => "PLUGIN_ORDER",
            Error::Configuration(ConfigurationError::DuplicateRegistration { .. }) => {
                "DUPLICATE_REGISTRATION"
            }
            Error::Configuration(ConfigurationError::TreeShakingEnabled) => "TREE_SHAKING_ENABLED",
            Error::Configuration(ConfigurationError::PreserveModulesDisabled) => {
                "PRESERVE_MODULES_DISABLED"
            }
            Error::Configuration(ConfigurationError::MultipleOutputs { .. }) => "MULTIPLE_OUTPUTS",
            Error::Configuration(ConfigurationError::ChunkCardinality { .. }) => {
                "CHUNK_CARDINALITY"
            }
            Error::Resolution { .. } => "RESOLUTION_ERROR",
            Error::GraphInconsistency(_) => "GRAPH_INCONSISTENCY",
            Error::Graph(_) => "GRAPH_ERROR",
            Error::Host(_) => "HOST_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::Configuration(ConfigurationError::PluginOrder { expected, .. }) => Some(
                Box::new(format!("Move '{expected}' to the front of the plugin list.")),
            ),
            Error::Configuration(ConfigurationError::DuplicateRegistration { name, .. }) => {
                Some(Box::new(format!("Remove the extra '{name}' registrations.")))
            }
            Error::Configuration(ConfigurationError::TreeShakingEnabled) => Some(Box::new(
                "Set `treeshake: false`; removing code across modules breaks partial rebuilds.",
            )),
            Error::Configuration(ConfigurationError::PreserveModulesDisabled)
            | Error::Configuration(ConfigurationError::ChunkCardinality { .. }) => Some(Box::new(
                "Set `preserveModules: true` so every module is emitted as its own chunk.",
            )),
            Error::Configuration(ConfigurationError::MultipleOutputs { .. }) => Some(Box::new(
                "Configure a single output target while watching.",
            )),
            Error::Resolution { specifier, .. } => Some(Box::new(format!(
                "Check that '{specifier}' exists and the import path is correct."
            ))),
            _ => None,
        }
    }
}
