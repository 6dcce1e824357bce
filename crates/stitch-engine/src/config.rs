//! Engine and pipeline configuration.

use serde::Deserialize;

/// Default plugin name the engine registers under.
pub const DEFAULT_PLUGIN_NAME: &str = "stitch-incremental";

/// Engine settings.
///
/// Deserializable with defaults so hosts can embed it in their own config
/// files:
///
/// ```
/// use stitch_engine::EngineConfig;
///
/// let config: EngineConfig = serde_json::from_str(r#"{ "strictPluginOrder": false }"#).unwrap();
/// assert!(config.watch_mode);
/// assert!(!config.strict_plugin_order);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// When false, every hook is a passthrough and no state is kept.
    pub watch_mode: bool,
    /// Name the engine is registered under in the host pipeline.
    pub plugin_name: String,
    /// Fail (instead of warn) when the engine is not the first plugin.
    pub strict_plugin_order: bool,
    /// Entry file name pattern used on incremental builds.
    pub incremental_entry_file_names: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            watch_mode: true,
            plugin_name: DEFAULT_PLUGIN_NAME.to_string(),
            strict_plugin_order: true,
            incremental_entry_file_names: "[name]".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watch_mode(mut self, watch_mode: bool) -> Self {
        self.watch_mode = watch_mode;
        self
    }

    pub fn with_plugin_name(mut self, name: impl Into<String>) -> Self {
        self.plugin_name = name.into();
        self
    }

    pub fn with_strict_plugin_order(mut self, strict: bool) -> Self {
        self.strict_plugin_order = strict;
        self
    }

    pub fn with_incremental_entry_file_names(mut self, pattern: impl Into<String>) -> Self {
        self.incremental_entry_file_names = pattern.into();
        self
    }
}

/// The host pipeline, as far as validation cares about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Plugin names in execution order.
    pub plugins: Vec<String>,
    pub tree_shake: bool,
    pub preserve_modules: bool,
    /// Number of configured output targets.
    pub output_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            plugins: vec![DEFAULT_PLUGIN_NAME.to_string()],
            tree_shake: false,
            preserve_modules: true,
            output_count: 1,
        }
    }
}

impl PipelineConfig {
    pub fn new<I, S>(plugins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            plugins: plugins.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_tree_shake(mut self, enabled: bool) -> Self {
        self.tree_shake = enabled;
        self
    }

    pub fn with_preserve_modules(mut self, enabled: bool) -> Self {
        self.preserve_modules = enabled;
        self
    }

    pub fn with_output_count(mut self, count: usize) -> Self {
        self.output_count = count;
        self
    }
}

/// Output options the engine wants the host to apply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    /// Entry file name pattern; `None` keeps the host's own setting.
    pub entry_file_names: Option<String>,
}
