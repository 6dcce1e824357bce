//! Description of a finished bundle, as handed to [`finalize`].
//!
//! [`finalize`]: crate::IncrementalEngine::finalize

use stitch_graph::ResolvedId;

/// Kind of an emitted output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkKind {
    /// JavaScript chunk built from modules.
    #[default]
    Chunk,
    /// Static asset (CSS, images, ...). Never tracked by the engine.
    Asset,
}

/// One emitted output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestChunk {
    /// Output-relative file name as reported by the bundler (`components/Button.js`).
    pub file_name: String,
    pub kind: ChunkKind,
    /// Modules rendered into this chunk.
    pub modules: Vec<ResolvedId>,
    /// Export names of the chunk.
    pub exports: Vec<String>,
    pub is_entry: bool,
}

impl ManifestChunk {
    /// A chunk containing exactly one module.
    pub fn single(file_name: impl Into<String>, module: impl Into<ResolvedId>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ChunkKind::Chunk,
            modules: vec![module.into()],
            exports: Vec::new(),
            is_entry: false,
        }
    }

    pub fn asset(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            kind: ChunkKind::Asset,
            modules: Vec::new(),
            exports: Vec::new(),
            is_entry: false,
        }
    }

    pub fn with_modules(mut self, modules: Vec<ResolvedId>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_exports<I, S>(mut self, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports = exports.into_iter().map(Into::into).collect();
        self
    }

    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    pub fn has_default_export(&self) -> bool {
        self.exports.iter().any(|name| name == "default")
    }

    /// Chunks the engine does not track: assets, proxy wrappers and the
    /// placeholder of a no-op cycle.
    pub(crate) fn is_untracked(&self) -> bool {
        self.kind == ChunkKind::Asset
            || (!self.modules.is_empty()
                && self
                    .modules
                    .iter()
                    .all(|m| matches!(m, ResolvedId::Proxy(_) | ResolvedId::Placeholder)))
    }
}

/// All files written by one build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleManifest {
    pub chunks: Vec<ManifestChunk>,
}

impl BundleManifest {
    pub fn new(chunks: Vec<ManifestChunk>) -> Self {
        Self { chunks }
    }

    pub fn push(&mut self, chunk: ManifestChunk) {
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, file_name: &str) -> Option<&ManifestChunk> {
        self.chunks.iter().find(|c| c.file_name == file_name)
    }
}
