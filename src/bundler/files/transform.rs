//! Content transformers applied while files are collected.
//!
//! A transformer rewrites a file's bytes without touching the source tree,
//! e.g. to adjust the packaged `package.json`. Transformers are consulted in
//! priority order through a [`TransformerChain`]; the first one returning
//! content wins, and `None` from all of them means "copy unchanged".

use crate::bundler::{Error, Result};
use std::path::Path;
use std::sync::Arc;

/// Rewrites file contents during packaging.
pub trait ContentTransformer: Send + Sync + std::fmt::Debug {
    /// Whether this transformer may want to rewrite `destination`.
    ///
    /// Files nobody wants are copied without being read.
    fn wants(&self, destination: &Path) -> bool;

    /// Returns the new content, or `None` to leave the file unchanged.
    fn transform(&self, destination: &Path, content: &[u8]) -> Result<Option<Vec<u8>>>;
}

/// Ordered list of transformers; first non-passthrough result wins.
#[derive(Debug, Clone, Default)]
pub struct TransformerChain {
    transformers: Vec<Arc<dyn ContentTransformer>>,
}

impl TransformerChain {
    /// An empty chain (everything passes through).
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transformer with lower priority than those already present.
    pub fn with(mut self, transformer: Arc<dyn ContentTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    /// Chain consulting `self` first, then `fallback`.
    pub fn then(mut self, fallback: &TransformerChain) -> Self {
        self.transformers.extend(fallback.transformers.iter().cloned());
        self
    }

    /// Whether the chain has no transformers.
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Whether any transformer wants `destination`.
    pub fn wants(&self, destination: &Path) -> bool {
        self.transformers.iter().any(|t| t.wants(destination))
    }

    /// Runs the chain over one file.
    pub fn apply(&self, destination: &Path, content: &[u8]) -> Result<Option<Vec<u8>>> {
        for transformer in &self.transformers {
            if !transformer.wants(destination) {
                continue;
            }
            if let Some(transformed) = transformer.transform(destination, content)? {
                log::debug!("transformed {}", destination.display());
                return Ok(Some(transformed));
            }
        }
        Ok(None)
    }
}

/// Keys only meaningful to the build, removed from the packaged descriptor.
const BUILD_ONLY_KEYS: [&str; 4] = ["build", "devDependencies", "scripts", "directories"];

/// Rewrites the application's root `package.json`.
///
/// Merges configured extra metadata (for instance a different `main`) and
/// drops build-only keys.
#[derive(Debug, Clone, Default)]
pub struct PackageDescriptorTransformer {
    extra_metadata: serde_json::Map<String, serde_json::Value>,
}

impl PackageDescriptorTransformer {
    /// Creates a transformer merging `extra_metadata` (a JSON object) into the descriptor.
    pub fn new(extra_metadata: Option<&serde_json::Value>) -> Self {
        Self {
            extra_metadata: extra_metadata
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default(),
        }
    }
}

impl ContentTransformer for PackageDescriptorTransformer {
    fn wants(&self, destination: &Path) -> bool {
        destination == Path::new("package.json")
    }

    fn transform(&self, destination: &Path, content: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut descriptor: serde_json::Value = serde_json::from_slice(content).map_err(|e| {
            Error::Configuration(format!(
                "{} is not valid JSON: {e}",
                destination.display()
            ))
        })?;
        let Some(object) = descriptor.as_object_mut() else {
            return Err(Error::Configuration(format!(
                "{} must contain a JSON object",
                destination.display()
            )));
        };

        let has_build_keys = BUILD_ONLY_KEYS.iter().any(|k| object.contains_key(*k));
        if !has_build_keys && self.extra_metadata.is_empty() {
            return Ok(None);
        }

        for key in BUILD_ONLY_KEYS {
            object.remove(key);
        }
        for (key, value) in &self.extra_metadata {
            merge_value(object.entry(key.clone()).or_insert(serde_json::Value::Null), value);
        }

        let mut out = serde_json::to_vec_pretty(&descriptor)?;
        out.push(b'\n');
        Ok(Some(out))
    }
}

/// Deep-merges objects; any other value replaces the target.
fn merge_value(target: &mut serde_json::Value, value: &serde_json::Value) {
    match (target, value) {
        (serde_json::Value::Object(target), serde_json::Value::Object(value)) => {
            for (key, v) in value {
                merge_value(target.entry(key.clone()).or_insert(serde_json::Value::Null), v);
            }
        }
        (target, value) => *target = value.clone(),
    }
}
