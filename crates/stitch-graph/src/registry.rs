//! Module ↔ chunk registry.
//!
//! The registry remembers, for every module that was ever bundled into its own
//! chunk, where that chunk lives in the output directory. Incremental builds
//! rely on it to point rebuilt modules at the unchanged chunks of their
//! neighbours instead of bundling them again.

use rustc_hash::FxHashMap;

use crate::{ChunkPath, Error, ModuleId, Result};

/// How a module without a static export list exposes its bindings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyntheticExports {
    /// No synthetic export object; only the raw namespace is available.
    #[default]
    None,
    /// Named bindings are properties of the default export.
    Default,
    /// Named bindings are properties of the export with this name.
    Named(String),
}

impl SyntheticExports {
    /// Export name holding the synthetic bindings, if any.
    pub fn export_name(&self) -> Option<&str> {
        match self {
            SyntheticExports::None => None,
            SyntheticExports::Default => Some("default"),
            SyntheticExports::Named(name) => Some(name),
        }
    }
}

/// Export-shape record of a module that needs a proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportShape {
    pub has_default_export: bool,
    pub synthetic_exports: SyntheticExports,
    /// Output path of the emitted proxy chunk, once a build produced one.
    pub proxy_chunk: Option<ChunkPath>,
}

impl ExportShape {
    pub fn new(has_default_export: bool, synthetic_exports: SyntheticExports) -> Self {
        Self {
            has_default_export,
            synthetic_exports,
            proxy_chunk: None,
        }
    }
}

/// Bidirectional mapping between modules and their single-module chunks.
#[derive(Debug, Clone, Default)]
pub struct ChunkRegistry {
    chunks: FxHashMap<ModuleId, ChunkPath>,
    owners: FxHashMap<ChunkPath, ModuleId>,
    shapes: FxHashMap<ModuleId, ExportShape>,
}

impl ChunkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.chunks.contains_key(id)
    }

    pub fn chunk_of(&self, id: &ModuleId) -> Option<&ChunkPath> {
        self.chunks.get(id)
    }

    /// Module whose chunk is emitted at `path`.
    pub fn owner_of(&self, path: &ChunkPath) -> Option<&ModuleId> {
        self.owners.get(path)
    }

    /// Record (or move) the chunk of `id`.
    ///
    /// Returns the previous chunk path when the module moved. Fails without
    /// touching the registry when `path` already belongs to another module.
    pub fn insert(&mut self, id: ModuleId, path: ChunkPath) -> Result<Option<ChunkPath>> {
        if let Some(owner) = self.owners.get(&path) {
            if owner != &id {
                return Err(Error::ChunkPathConflict {
                    path: path.to_string(),
                    owner: owner.to_string(),
                    module: id.to_string(),
                });
            }
        }

        let previous = self.chunks.insert(id.clone(), path.clone());
        if let Some(old) = &previous {
            if old != &path {
                self.owners.remove(old);
            }
        }
        self.owners.insert(path, id);

        Ok(previous.filter(|old| self.owners.get(old).is_none()))
    }

    /// Drop a module's chunk together with its export-shape record.
    pub fn remove(&mut self, id: &ModuleId) -> Option<ChunkPath> {
        self.shapes.remove(id);
        let path = self.chunks.remove(id)?;
        self.owners.remove(&path);
        Some(path)
    }

    pub fn shape_of(&self, id: &ModuleId) -> Option<&ExportShape> {
        self.shapes.get(id)
    }

    /// Attach an export-shape record to a registered module.
    ///
    /// Records are only kept for modules that own a chunk; returns `false`
    /// (and stores nothing) otherwise.
    pub fn set_shape(&mut self, id: &ModuleId, shape: ExportShape) -> bool {
        if !self.chunks.contains_key(id) {
            return false;
        }
        self.shapes.insert(id.clone(), shape);
        true
    }

    pub fn clear_shape(&mut self, id: &ModuleId) -> Option<ExportShape> {
        self.shapes.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ModuleId, &ChunkPath)> {
        self.chunks.iter()
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleId> {
        self.chunks.keys()
    }

    pub fn shapes(&self) -> impl Iterator<Item = (&ModuleId, &ExportShape)> {
        self.shapes.iter()
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.owners.clear();
        self.shapes.clear();
    }
}
