//! Shared test utilities for stitch-engine tests
//!
//! Provides an in-memory [`ModuleHost`] and a miniature bundler that drives
//! the engine hooks the way a watch-mode bundler does: plan, build start,
//! resolve/load every module, build end, render one chunk per module,
//! finalize.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use stitch_engine::{
    BuildPlan, BundleManifest, ChunkPath, EngineConfig, Error, ExportInfo, FinalizeReport,
    HostError, HostResolution, HostResult, IncrementalEngine, ManifestChunk, ModuleHost, ModuleId,
    PLACEHOLDER_CHUNK_NAME, PipelineConfig, ResolveOutcome, ResolvedId, Result, SyntheticExports,
};

pub fn id(s: &str) -> ModuleId {
    ModuleId::new(s)
}

/// Source module known to the fake host.
#[derive(Debug, Clone)]
pub struct FakeModule {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub info: ExportInfo,
    pub body: String,
}

impl FakeModule {
    pub fn new(body: &str) -> Self {
        Self {
            imports: Vec::new(),
            exports: Vec::new(),
            info: ExportInfo::static_shape(false),
            body: body.to_string(),
        }
    }

    pub fn import(mut self, specifier: &str) -> Self {
        self.imports.push(specifier.to_string());
        self
    }

    pub fn export(mut self, name: &str) -> Self {
        if name == "default" {
            self.info.has_default_export = true;
        }
        self.exports.push(name.to_string());
        self
    }

    /// Exports only known at runtime (CommonJS-style).
    pub fn dynamic(mut self, synthetic: SyntheticExports) -> Self {
        self.info = ExportInfo::dynamic(self.info.has_default_export, synthetic);
        self
    }
}

/// In-memory module host with relative-path resolution.
#[derive(Debug, Default)]
pub struct FakeHost {
    modules: RwLock<BTreeMap<ModuleId, FakeModule>>,
    resolve_calls: AtomicUsize,
    resolve_delay: Option<Duration>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, module: &str, source: FakeModule) -> Self {
        self.add(module, source);
        self
    }

    /// Sleep before answering every resolution, so concurrent ones overlap.
    pub fn with_resolve_delay(mut self, delay: Duration) -> Self {
        self.resolve_delay = Some(delay);
        self
    }

    pub fn add(&self, module: &str, source: FakeModule) {
        self.modules.write().insert(id(module), source);
    }

    pub fn update(&self, module: &str, f: impl FnOnce(&mut FakeModule)) {
        if let Some(source) = self.modules.write().get_mut(&id(module)) {
            f(source);
        }
    }

    pub fn remove(&self, module: &str) {
        self.modules.write().remove(&id(module));
    }

    pub fn module(&self, module: &ModuleId) -> Option<FakeModule> {
        self.modules.read().get(module).cloned()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Join a relative specifier onto the importer's directory.
    pub fn join(importer: &ModuleId, specifier: &str) -> String {
        let mut segments: Vec<&str> = importer.as_str().split('/').collect();
        segments.pop();
        for part in specifier.split('/') {
            match part {
                "." | "" => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        segments.join("/")
    }
}

#[async_trait]
impl ModuleHost for FakeHost {
    async fn resolve(
        &self,
        specifier: &str,
        importer: &ModuleId,
    ) -> HostResult<Option<HostResolution>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.resolve_delay {
            tokio::time::sleep(delay).await;
        }

        let resolved = if specifier.starts_with('.') {
            id(&Self::join(importer, specifier))
        } else if specifier.starts_with('/') || specifier.starts_with('\0') {
            id(specifier)
        } else {
            // bare package
            return Ok(Some(HostResolution::external(specifier)));
        };

        Ok(self
            .modules
            .read()
            .contains_key(&resolved)
            .then(|| HostResolution::new(resolved)))
    }

    async fn export_info(&self, module: &ModuleId) -> HostResult<ExportInfo> {
        self.modules
            .read()
            .get(module)
            .map(|m| m.info.clone())
            .ok_or_else(|| HostError::UnknownModule(module.clone()))
    }
}

/// `/src/a.js → /src/b.js → /src/c.js`, with `a` as the entry.
pub fn abc_host() -> FakeHost {
    FakeHost::new()
        .with(
            "/src/a.js",
            FakeModule::new("console.log(b);").import("./b.js"),
        )
        .with(
            "/src/b.js",
            FakeModule::new("export default c;")
                .import("./c.js")
                .export("default"),
        )
        .with(
            "/src/c.js",
            FakeModule::new("export const c = 1;").export("c"),
        )
}

/// Output file of a module: preserved-module layout under the output root.
pub fn chunk_file(module: &ResolvedId) -> String {
    fn strip(module: &ModuleId) -> &str {
        module
            .as_str()
            .trim_start_matches('\0')
            .trim_start_matches("/src/")
    }

    match module {
        ResolvedId::Real(m) => strip(m).to_string(),
        ResolvedId::Proxy(m) => format!("_proxy/{}", strip(m)),
        ResolvedId::Placeholder => PLACEHOLDER_CHUNK_NAME.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Import {
    Chunk(ResolvedId),
    External(String),
}

#[derive(Debug)]
struct Loaded {
    id: ResolvedId,
    is_entry: bool,
    imports: Vec<Import>,
    body: String,
    exports: Vec<String>,
}

/// Result of one [`MiniBundler::build`].
#[derive(Debug)]
pub struct BuildOutcome {
    pub plan: BuildPlan,
    /// Files written by this build.
    pub written: BTreeMap<String, String>,
    pub manifest: BundleManifest,
    pub report: FinalizeReport,
    pub watch_files: Vec<ModuleId>,
    pub entry_file_names: Option<String>,
    pub changed: Option<Vec<ModuleId>>,
}

/// Miniature preserve-modules bundler driving the engine hooks.
pub struct MiniBundler {
    pub engine: Arc<IncrementalEngine>,
    pub host: Arc<FakeHost>,
    pub entries: Vec<ModuleId>,
    pub pipeline: PipelineConfig,
    /// Everything written so far, by file name.
    pub output: BTreeMap<String, String>,
}

impl MiniBundler {
    pub fn new(host: FakeHost, entries: &[&str]) -> Self {
        Self::with_config(host, entries, EngineConfig::default())
    }

    pub fn with_config(host: FakeHost, entries: &[&str], config: EngineConfig) -> Self {
        let host = Arc::new(host);
        let engine = Arc::new(IncrementalEngine::new(config, host.clone()));
        Self {
            engine,
            host,
            entries: entries.iter().map(|e| id(e)).collect(),
            pipeline: PipelineConfig::default(),
            output: BTreeMap::new(),
        }
    }

    pub async fn build(&mut self) -> Result<BuildOutcome> {
        let plan = self.engine.plan_build();

        let start = match self.engine.build_start(&self.pipeline) {
            Ok(start) => start,
            Err(e) => {
                self.engine.build_end(Some(&e));
                return Err(e);
            }
        };
        let changed = self.engine.changed_modules();

        let loaded = match self.load_all(&plan).await {
            Ok(loaded) => loaded,
            Err(e) => {
                self.engine.build_end(Some(&e));
                return Err(e);
            }
        };
        self.engine.build_end(None);

        let entry_file_names = self.engine.output_options().entry_file_names;
        let (manifest, written) = render(&loaded);
        let report = self.engine.finalize(&manifest).await?;

        self.output.extend(written.clone());
        Ok(BuildOutcome {
            plan,
            written,
            manifest,
            report,
            watch_files: start.watch_files,
            entry_file_names,
            changed,
        })
    }

    async fn load_all(&self, plan: &BuildPlan) -> Result<Vec<Loaded>> {
        let inputs: Vec<ResolvedId> = match plan.inputs() {
            Some(inputs) => inputs.into_iter().map(|(_, input)| input).collect(),
            None => self.entries.iter().cloned().map(ResolvedId::Real).collect(),
        };
        let entries: BTreeSet<ResolvedId> = inputs.iter().cloned().collect();

        let mut queue: VecDeque<ResolvedId> = inputs.into();
        let mut seen = BTreeSet::new();
        let mut loaded = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }

            let (specifiers, body, exports) = match self.engine.load(&current)? {
                Some(output) => match &current {
                    ResolvedId::Proxy(m) => {
                        let mut exports = Vec::new();
                        if output.code.contains("export { default }") {
                            exports.push("default".to_string());
                        }
                        exports.extend(output.synthetic_named_exports.clone());
                        (vec![m.as_str().to_string()], output.code, exports)
                    }
                    _ => (Vec::new(), output.code, Vec::new()),
                },
                None => {
                    let module = current.module().cloned().unwrap_or_else(|| id(""));
                    let source = self
                        .host
                        .module(&module)
                        .ok_or_else(|| Error::Host(HostError::UnknownModule(module.clone())))?;
                    (source.imports, source.body, source.exports)
                }
            };

            let mut imports = Vec::new();
            for specifier in specifiers {
                let import = match self.engine.resolve_id(&specifier, Some(&current)).await? {
                    ResolveOutcome::Passthrough => self.fallback_resolve(&specifier, &current).await?,
                    ResolveOutcome::Resolved { id, external: true } => {
                        Import::External(id.module().map(|m| m.to_string()).unwrap_or_default())
                    }
                    ResolveOutcome::Resolved { id, external: false } => Import::Chunk(id),
                    ResolveOutcome::External { path } => Import::External(path),
                };
                if let Import::Chunk(target) = &import {
                    queue.push_back(target.clone());
                }
                imports.push(import);
            }

            loaded.push(Loaded {
                is_entry: entries.contains(&current),
                id: current,
                imports,
                body,
                exports,
            });
        }

        Ok(loaded)
    }

    /// The host's own resolution when the engine passes.
    async fn fallback_resolve(&self, specifier: &str, importer: &ResolvedId) -> Result<Import> {
        let importer = importer.module().cloned().unwrap_or_else(|| id(""));
        match self.host.resolve(specifier, &importer).await? {
            Some(r) if r.external => Ok(Import::External(r.id.to_string())),
            Some(r) => Ok(Import::Chunk(ResolvedId::Real(r.id))),
            None => Err(Error::Host(HostError::ResolutionFailed {
                specifier: specifier.to_string(),
                importer,
                reason: "not found".to_string(),
            })),
        }
    }
}

/// One chunk per module; imports rendered as relative file references.
fn render(loaded: &[Loaded]) -> (BundleManifest, BTreeMap<String, String>) {
    let mut manifest = BundleManifest::default();
    let mut written = BTreeMap::new();

    for module in loaded {
        let file = chunk_file(&module.id);
        let here = ChunkPath::new(&file).unwrap();

        let mut code = format!("// {}\n", module.id);
        for import in &module.imports {
            let reference = match import {
                Import::Chunk(target) => ChunkPath::new(chunk_file(target))
                    .unwrap()
                    .relative_from(&here),
                Import::External(path) => path.clone(),
            };
            code.push_str(&format!("import \"{reference}\";\n"));
        }
        code.push_str(&module.body);
        code.push('\n');

        let mut chunk = ManifestChunk::single(file.clone(), module.id.clone())
            .with_exports(module.exports.iter().cloned());
        if module.is_entry {
            chunk = chunk.entry();
        }
        manifest.push(chunk);
        written.insert(file, code);
    }

    (manifest, written)
}

/// Assert that every reachable module is registered and every registered
/// chunk exists in the output.
pub fn assert_registry_complete(bundler: &MiniBundler) {
    let registry = bundler.engine.registry();
    let graph = bundler.engine.graph();

    for module in graph.reachable_from_entries() {
        assert!(registry.contains(&module), "{module} is reachable but unregistered");
    }
    for (module, chunk) in registry.iter() {
        assert!(
            bundler.output.contains_key(chunk.file_name()),
            "{module} is registered at {chunk}, which was never written"
        );
    }
    assert!(graph.is_consistent());
}
