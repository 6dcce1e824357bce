//! Pipeline checks run at build start.
//!
//! Partial rebuilds only work when every module lands in its own chunk and
//! the engine sees each import before any other resolver does.

use crate::{ConfigurationError, EngineConfig, PipelineConfig, Result};

/// Validate the host pipeline against the engine's requirements.
///
/// Checks run in a fixed order so the first reported problem is stable:
/// duplicate registration, plugin order, tree shaking, preserved modules,
/// output count.
pub fn validate_pipeline(config: &EngineConfig, pipeline: &PipelineConfig) -> Result<()> {
    let count = pipeline
        .plugins
        .iter()
        .filter(|name| **name == config.plugin_name)
        .count();
    if count > 1 {
        return Err(ConfigurationError::DuplicateRegistration {
            name: config.plugin_name.clone(),
            count,
        }
        .into());
    }

    match pipeline.plugins.first() {
        Some(first) if *first == config.plugin_name => {}
        first => {
            let found = first.cloned().unwrap_or_else(|| "<none>".to_string());
            if config.strict_plugin_order {
                return Err(ConfigurationError::PluginOrder {
                    expected: config.plugin_name.clone(),
                    found,
                }
                .into());
            }
            tracing::warn!(
                "[stitch] '{}' should be the first plugin, found '{}' first",
                config.plugin_name,
                found
            );
        }
    }

    if pipeline.tree_shake {
        return Err(ConfigurationError::TreeShakingEnabled.into());
    }

    if !pipeline.preserve_modules {
        return Err(ConfigurationError::PreserveModulesDisabled.into());
    }

    if pipeline.output_count > 1 {
        return Err(ConfigurationError::MultipleOutputs {
            count: pipeline.output_count,
        }
        .into());
    }

    Ok(())
}
