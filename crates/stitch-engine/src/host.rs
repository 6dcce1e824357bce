//! Contract with the host bundler.
//!
//! The engine never parses or resolves modules itself. Everything it needs to
//! know about the program comes through [`ModuleHost`], which bundler
//! integrations implement on top of their own resolver and module metadata.

use async_trait::async_trait;
use stitch_graph::{ExportShape, ModuleId, SyntheticExports};

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors reported by the host bundler
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The resolver failed (as opposed to "not found", which is `Ok(None)`)
    #[error("Failed to resolve module '{specifier}' from '{importer}': {reason}")]
    ResolutionFailed {
        specifier: String,
        importer: ModuleId,
        reason: String,
    },

    /// No metadata is available for the module
    #[error("Unknown module: {0}")]
    UnknownModule(ModuleId),

    /// Other host error
    #[error("{0}")]
    Other(String),
}

/// Canonical result of a host resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResolution {
    pub id: ModuleId,
    /// The host already treats the target as external (e.g. a bare package).
    pub external: bool,
}

impl HostResolution {
    pub fn new(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            external: false,
        }
    }

    pub fn external(id: impl Into<ModuleId>) -> Self {
        Self {
            id: id.into(),
            external: true,
        }
    }
}

/// Export metadata of a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportInfo {
    /// Whether the export list is known without executing the module.
    pub has_static_shape: bool,
    pub has_default_export: bool,
    pub synthetic_exports: SyntheticExports,
}

impl ExportInfo {
    /// An ES module with a statically analyzable export list.
    pub fn static_shape(has_default_export: bool) -> Self {
        Self {
            has_static_shape: true,
            has_default_export,
            synthetic_exports: SyntheticExports::None,
        }
    }

    /// A module whose exports are only known once it runs (CommonJS interop,
    /// synthetic named exports, ...).
    pub fn dynamic(has_default_export: bool, synthetic_exports: SyntheticExports) -> Self {
        Self {
            has_static_shape: false,
            has_default_export,
            synthetic_exports,
        }
    }

    pub fn needs_proxy(&self) -> bool {
        !self.has_static_shape
    }

    pub(crate) fn to_shape(&self) -> ExportShape {
        ExportShape::new(self.has_default_export, self.synthetic_exports.clone())
    }
}

/// Host bundler operations consumed by the engine.
///
/// Implementations must be cheap to call repeatedly; the engine may issue
/// several resolutions concurrently while the bundler walks the graph.
///
/// # Example
///
/// ```rust,ignore
/// use stitch_engine::{ExportInfo, HostResolution, HostResult, ModuleHost};
/// use stitch_graph::ModuleId;
/// use async_trait::async_trait;
///
/// struct MyHost;
///
/// #[async_trait]
/// impl ModuleHost for MyHost {
///     async fn resolve(&self, specifier: &str, importer: &ModuleId) -> HostResult<Option<HostResolution>> {
///         // delegate to the bundler's resolver
///         todo!()
///     }
///
///     async fn export_info(&self, id: &ModuleId) -> HostResult<ExportInfo> {
///         Ok(ExportInfo::static_shape(true))
///     }
/// }
/// ```
#[async_trait]
pub trait ModuleHost: Send + Sync {
    /// Resolve `specifier` as imported from `importer`.
    ///
    /// Returns `Ok(None)` when the module does not exist. Must be idempotent
    /// for the same inputs within a build.
    async fn resolve(
        &self,
        specifier: &str,
        importer: &ModuleId,
    ) -> HostResult<Option<HostResolution>>;

    /// Export metadata of a resolved module.
    async fn export_info(&self, id: &ModuleId) -> HostResult<ExportInfo>;
}
