//! Stage preparation and pipeline hooks.

use super::context::PackContext;
use crate::bundler::{Result, utils::fs};
use async_trait::async_trait;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

/// Materializes the base runtime tree before application files are copied.
#[async_trait]
pub trait StagePreparer: Send + Sync + std::fmt::Debug {
    async fn prepare(&self, context: &PackContext) -> Result<()>;
}

/// Leaves the output directory empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStage;

#[async_trait]
impl StagePreparer for NoopStage {
    async fn prepare(&self, context: &PackContext) -> Result<()> {
        fs::create_dir_all(&context.app_out_dir, false).await
    }
}

/// Copies a prebuilt runtime directory into the output directory.
#[derive(Debug, Clone)]
pub struct CopyRuntimeStage {
    pub runtime_dir: PathBuf,
}

impl CopyRuntimeStage {
    pub fn new(runtime_dir: impl Into<PathBuf>) -> Self {
        Self {
            runtime_dir: runtime_dir.into(),
        }
    }
}

#[async_trait]
impl StagePreparer for CopyRuntimeStage {
    async fn prepare(&self, context: &PackContext) -> Result<()> {
        log::info!(
            "copying runtime {} to {}",
            self.runtime_dir.display(),
            context.app_out_dir.display()
        );
        fs::copy_dir(&self.runtime_dir, &context.app_out_dir).await
    }
}

/// Called after packing and after signing.
#[async_trait]
pub trait PackHook: Send + Sync {
    async fn run(&self, context: &PackContext) -> Result<()>;
}

type HookFn = dyn Fn(PackContext) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send + Sync;

/// [`PackHook`] from an async closure.
///
/// ```
/// use kodegen_bundler_package::bundler::FnHook;
///
/// let hook = FnHook::new(|context| async move {
///     println!("packed {}", context.app_out_dir.display());
///     Ok(())
/// });
/// ```
#[derive(Clone)]
pub struct FnHook {
    hook: Arc<HookFn>,
}

impl FnHook {
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(PackContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        Self {
            hook: Arc::new(move |context| Box::pin(hook(context))),
        }
    }
}

impl std::fmt::Debug for FnHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnHook")
    }
}

#[async_trait]
impl PackHook for FnHook {
    async fn run(&self, context: &PackContext) -> Result<()> {
        (self.hook)(context.clone()).await
    }
}
