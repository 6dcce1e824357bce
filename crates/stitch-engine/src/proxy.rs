//! Proxy modules for modules without a static export list.
//!
//! A proxy imports the module's whole namespace and re-exports it as one
//! merged object, so importers see the same shape whether or not the module
//! itself was part of the build.

use stitch_graph::{ExportShape, ModuleId, ResolvedId};

use crate::engine::IncrementalEngine;
use crate::{Error, Result};

/// Name of the merged namespace export of every proxy.
pub const PROXY_NAMESPACE_EXPORT: &str = "__namespace";

/// Source handed to the host by the load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutput {
    pub code: String,
    /// Export the host should expose named bindings from.
    pub synthetic_named_exports: Option<String>,
}

/// JavaScript string literal for `value`.
fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Source text of the proxy module for `module`.
///
/// Bindings derived from the default (or synthetic) export are merged first,
/// the raw namespace last, so named exports win on collision.
pub fn synthesize(module: &ModuleId, shape: &ExportShape) -> String {
    let source = js_string(module.as_str());
    let mut code = format!("import * as __ns from {source};\n");

    if shape.has_default_export {
        code.push_str(&format!("export {{ default }} from {source};\n"));
    }

    let derived = match shape.synthetic_exports.export_name() {
        Some(name) => {
            code.push_str(&format!("const __derived = __ns[{}];\n", js_string(name)));
            "(__derived !== null && (typeof __derived === \"object\" || typeof __derived === \"function\") ? __derived : {})"
        }
        None => "{}",
    };

    code.push_str(&format!(
        "export const {PROXY_NAMESPACE_EXPORT} = Object.assign({{}}, {derived}, __ns);\n"
    ));
    code
}

impl IncrementalEngine {
    /// Load hook. Returns `None` for real modules, which the host loads itself.
    pub fn load(&self, id: &ResolvedId) -> Result<Option<LoadOutput>> {
        match id {
            ResolvedId::Real(_) => Ok(None),
            ResolvedId::Placeholder => Ok(Some(LoadOutput {
                code: "export {};\n".to_string(),
                synthetic_named_exports: None,
            })),
            ResolvedId::Proxy(module) => {
                let state = self.state.lock();
                let shape = state
                    .session
                    .as_ref()
                    .and_then(|s| s.pending_shapes.get(module))
                    .or_else(|| state.registry.shape_of(module))
                    .ok_or_else(|| {
                        Error::GraphInconsistency(format!("no export shape recorded for proxy of {module}"))
                    })?;

                Ok(Some(LoadOutput {
                    code: synthesize(module, shape),
                    synthetic_named_exports: Some(PROXY_NAMESPACE_EXPORT.to_string()),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stitch_graph::SyntheticExports;

    #[test]
    fn test_synthesize_with_default_and_synthetic_exports() {
        let code = synthesize(
            &ModuleId::new("/src/legacy.cjs"),
            &ExportShape::new(true, SyntheticExports::Default),
        );

        assert!(code.contains("import * as __ns from \"/src/legacy.cjs\";"));
        assert!(code.contains("export { default } from \"/src/legacy.cjs\";"));
        assert!(code.contains("const __derived = __ns[\"default\"];"));
        assert!(code.contains("export const __namespace = Object.assign({}, "));
        // raw namespace merged last
        assert!(code.trim_end().ends_with("__ns);"));
    }

    #[test]
    fn test_synthesize_without_default() {
        let code = synthesize(&ModuleId::new("/src/a.js"), &ExportShape::new(false, SyntheticExports::None));
        assert!(!code.contains("export { default }"));
        assert!(!code.contains("__derived"));
        assert!(code.contains("Object.assign({}, {}, __ns)"));
    }

    #[test]
    fn test_synthesize_escapes_ids() {
        let code = synthesize(
            &ModuleId::new("\0virtual\"quoted"),
            &ExportShape::new(false, SyntheticExports::Named("__moduleExports".into())),
        );
        assert!(code.contains(r#"from "\u0000virtual\"quoted";"#));
        assert!(code.contains(r#"__ns["__moduleExports"]"#));
    }
}
