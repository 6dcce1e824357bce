//! Pipeline validation and watch-mode gating through full build cycles.

mod helpers;

use helpers::{MiniBundler, abc_host, id};
use miette::Diagnostic;
use stitch_engine::{
    BuildMode, ConfigurationError, EngineConfig, Error, FinalizeReport, PipelineConfig,
};

fn configuration_error(result: stitch_engine::Result<helpers::BuildOutcome>) -> ConfigurationError {
    match result {
        Err(Error::Configuration(e)) => e,
        other => panic!("expected configuration error, got {:?}", other.map(|o| o.plan)),
    }
}

#[tokio::test]
async fn test_tree_shaking_is_rejected_at_build_start() {
    let mut bundler = MiniBundler::new(abc_host(), &["/src/a.js"]);
    bundler.pipeline = PipelineConfig::default().with_tree_shake(true);

    let err = configuration_error(bundler.build().await);

    assert_eq!(err, ConfigurationError::TreeShakingEnabled);
    assert!(bundler.engine.registry().is_empty());
    assert!(bundler.output.is_empty());
}

#[tokio::test]
async fn test_invalid_pipeline_requeues_incremental_changes() {
    let mut bundler = MiniBundler::new(abc_host(), &["/src/a.js"]);
    bundler.build().await.unwrap();

    bundler.pipeline = PipelineConfig::default().with_preserve_modules(false);
    bundler.engine.notify_changed(id("/src/c.js"));

    assert_eq!(
        configuration_error(bundler.build().await),
        ConfigurationError::PreserveModulesDisabled
    );
    assert_eq!(bundler.engine.pending_invalidations(), vec![id("/src/c.js")]);

    bundler.pipeline = PipelineConfig::default();
    let outcome = bundler.build().await.unwrap();
    assert_eq!(outcome.plan.mode, BuildMode::Incremental);
}

#[tokio::test]
async fn test_plugin_position_and_duplicates() {
    let mut bundler = MiniBundler::new(abc_host(), &["/src/a.js"]);

    bundler.pipeline = PipelineConfig::new(["node-resolve", "stitch-incremental"]);
    assert!(matches!(
        configuration_error(bundler.build().await),
        ConfigurationError::PluginOrder { .. }
    ));

    bundler.pipeline = PipelineConfig::new(["stitch-incremental", "stitch-incremental"]);
    assert_eq!(
        configuration_error(bundler.build().await),
        ConfigurationError::DuplicateRegistration {
            name: "stitch-incremental".to_string(),
            count: 2
        }
    );

    bundler.pipeline = PipelineConfig::default().with_output_count(2);
    assert_eq!(
        configuration_error(bundler.build().await),
        ConfigurationError::MultipleOutputs { count: 2 }
    );
}

#[tokio::test]
async fn test_lenient_plugin_order_only_warns() {
    let config = EngineConfig::default().with_strict_plugin_order(false);
    let mut bundler = MiniBundler::with_config(abc_host(), &["/src/a.js"], config);
    bundler.pipeline = PipelineConfig::new(["node-resolve", "stitch-incremental"]);

    let outcome = bundler.build().await.unwrap();
    assert_eq!(outcome.report.registered, 3);
}

#[tokio::test]
async fn test_custom_plugin_name() {
    let config = EngineConfig::default().with_plugin_name("incremental");
    let mut bundler = MiniBundler::with_config(abc_host(), &["/src/a.js"], config);
    bundler.pipeline = PipelineConfig::new(["incremental", "stitch-incremental"]);

    assert!(bundler.build().await.is_ok());
}

#[tokio::test]
async fn test_engine_is_inert_outside_watch_mode() {
    let config = EngineConfig::default().with_watch_mode(false);
    let mut bundler = MiniBundler::with_config(abc_host(), &["/src/a.js"], config);
    // Not validated when inactive.
    bundler.pipeline = PipelineConfig::default().with_tree_shake(true);

    let first = bundler.build().await.unwrap();
    bundler.engine.notify_changed(id("/src/c.js"));
    let second = bundler.build().await.unwrap();

    for outcome in [&first, &second] {
        assert_eq!(outcome.plan.mode, BuildMode::Full);
        assert_eq!(outcome.written.len(), 3);
        assert_eq!(outcome.report, FinalizeReport::default());
        assert_eq!(outcome.entry_file_names, None);
    }
    assert!(bundler.engine.registry().is_empty());
    assert!(bundler.engine.pending_invalidations().is_empty());
    assert!(!bundler.engine.is_incremental_build());
}

#[test]
fn test_diagnostics() {
    let err = Error::from(ConfigurationError::ChunkCardinality {
        chunk: "vendor.js".to_string(),
        modules: 3,
    });
    assert_eq!(err.code().unwrap().to_string(), "CHUNK_CARDINALITY");
    assert!(err.help().unwrap().to_string().contains("preserveModules"));
    assert_eq!(
        err.to_string(),
        "Invalid configuration: chunk 'vendor.js' must contain exactly one module, found 3"
    );

    let err = Error::Resolution {
        specifier: "./gone.js".to_string(),
        importer: id("/src/b.js"),
    };
    assert_eq!(err.code().unwrap().to_string(), "RESOLUTION_ERROR");
    assert!(err.help().unwrap().to_string().contains("./gone.js"));
}
