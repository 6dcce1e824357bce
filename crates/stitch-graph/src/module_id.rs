//! Module identity types.

use std::fmt;
use std::sync::Arc;

/// Opaque identifier of a resolved source module.
///
/// Ids are produced by the host resolver and are stable across builds as long
/// as the module is not moved or renamed. Cloning is cheap (shared string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    /// Wrap a resolver-produced id.
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Virtual modules (ids starting with `\0`) have no file on disk and must
    /// never be handed to a file watcher.
    pub fn is_virtual(&self) -> bool {
        self.0.starts_with('\0')
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A module id as it travels through resolution, loading and the manifest.
///
/// The engine injects two kinds of synthetic modules into a build. Tagging
/// them here keeps them apart from real modules whose ids happen to look
/// similar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolvedId {
    /// A real source module.
    Real(ModuleId),
    /// The export-shape proxy wrapping the given module.
    Proxy(ModuleId),
    /// The empty module emitted to keep a no-op build cycle alive.
    Placeholder,
}

impl ResolvedId {
    /// The underlying module, for both real modules and their proxies.
    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            ResolvedId::Real(id) | ResolvedId::Proxy(id) => Some(id),
            ResolvedId::Placeholder => None,
        }
    }

    pub fn as_real(&self) -> Option<&ModuleId> {
        match self {
            ResolvedId::Real(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, ResolvedId::Proxy(_))
    }
}

impl From<ModuleId> for ResolvedId {
    fn from(value: ModuleId) -> Self {
        ResolvedId::Real(value)
    }
}

impl fmt::Display for ResolvedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedId::Real(id) => write!(f, "{id}"),
            ResolvedId::Proxy(id) => write!(f, "proxy({id})"),
            ResolvedId::Placeholder => f.write_str("placeholder"),
        }
    }
}
