//! # stitch-graph
//!
//! Pure bookkeeping structures for incremental rebuilds.
//!
//! This crate holds the state that has to survive between two builds of a
//! watch session, without any I/O, async runtime or bundler dependency:
//!
//! - [`ModuleId`] / [`ResolvedId`] - identity of resolved source modules and
//!   the synthetic modules the engine injects next to them
//! - [`ChunkPath`] - root-relative output path of a single-module chunk
//! - [`ChunkRegistry`] - bidirectional module ↔ chunk mapping plus the
//!   export-shape records needed to synthesize proxy modules
//! - [`DependencyGraph`] - importer/imported adjacency kept as exact inverses
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │      ChunkRegistry       │      │     DependencyGraph      │
//! │  ModuleId ──► ChunkPath  │      │  importers: id ──► {..}  │
//! │  ChunkPath ──► ModuleId  │      │  imported:  id ──► {..}  │
//! │  ModuleId ──► ExportShape│      │  Entry pseudo-importer   │
//! └──────────────────────────┘      └──────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use stitch_graph::{ChunkPath, ChunkRegistry, DependencyGraph, ModuleId};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let main = ModuleId::new("/src/main.js");
//! let dep = ModuleId::new("/src/dep.js");
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_entry(main.clone());
//! graph.set_imports(&main, [dep.clone()]);
//!
//! let mut registry = ChunkRegistry::new();
//! registry.insert(main.clone(), ChunkPath::new("main.js")?)?;
//! registry.insert(dep.clone(), ChunkPath::new("dep.js")?)?;
//!
//! assert!(graph.has_importers(&dep));
//! assert_eq!(registry.chunk_of(&dep).map(|c| c.as_str()), Some("/dep.js"));
//! # Ok(())
//! # }
//! ```
//!
//! Neither structure is synchronized. The engine owns both behind a single
//! lock and mutates them only at well-defined phase boundaries.

pub mod chunk_path;
pub mod graph;
pub mod module_id;
pub mod registry;

pub use chunk_path::ChunkPath;
pub use graph::{DependencyGraph, ImportDiff, Importer};
pub use module_id::{ModuleId, ResolvedId};
pub use registry::{ChunkRegistry, ExportShape, SyntheticExports};

/// Error types for graph and registry operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A chunk path was empty or pointed outside the output root.
    #[error("Invalid chunk path '{0}'")]
    InvalidChunkPath(String),

    /// Two different modules were mapped to the same output chunk.
    #[error("Chunk '{path}' already belongs to '{owner}', cannot assign it to '{module}'")]
    ChunkPathConflict {
        path: String,
        owner: String,
        module: String,
    },
}

/// Result type alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;
