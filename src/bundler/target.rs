//! Distributable targets built from a packaged output directory.
//!
//! Format-specific builders (installers, disk images, archives) implement
//! [`Target`]. Two simple targets ship with the crate:
//!
//! - [`DirTarget`] leaves the unpacked directory as the distributable.
//! - [`ChecksumTarget`] writes `<dir>.sha256` next to the output directory.

use crate::bundler::{Arch, Result, builder::checksum, error::ErrorExt};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A build unit for one output format.
#[async_trait]
pub trait Target: Send + Sync + std::fmt::Debug {
    /// Target name, e.g. `dir`.
    fn name(&self) -> &str;

    /// Whether builds of this target may overlap with other targets.
    ///
    /// Unsafe targets run after all safe ones have finished, one at a time.
    fn concurrency_safe(&self) -> bool {
        true
    }

    /// Builds the target from the finished output directory of `arch`.
    async fn build(&self, app_out_dir: &Path, arch: Arch) -> Result<()>;
}

/// The unpacked directory itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirTarget;

#[async_trait]
impl Target for DirTarget {
    fn name(&self) -> &str {
        "dir"
    }

    async fn build(&self, app_out_dir: &Path, arch: Arch) -> Result<()> {
        log::info!("{arch} application directory: {}", app_out_dir.display());
        Ok(())
    }
}

/// Writes a SHA-256 of the whole output tree to `<dir>.sha256`.
///
/// Reads the complete directory, so it needs all other targets finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumTarget;

impl ChecksumTarget {
    /// Checksum file written for `app_out_dir`.
    pub fn checksum_path(app_out_dir: &Path) -> PathBuf {
        let mut name = app_out_dir.as_os_str().to_os_string();
        name.push(".sha256");
        PathBuf::from(name)
    }
}

#[async_trait]
impl Target for ChecksumTarget {
    fn name(&self) -> &str {
        "checksum"
    }

    fn concurrency_safe(&self) -> bool {
        false
    }

    async fn build(&self, app_out_dir: &Path, _arch: Arch) -> Result<()> {
        let hash = checksum::calculate_sha256(app_out_dir).await?;
        let path = Self::checksum_path(app_out_dir);
        let dir_name = app_out_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::write(&path, format!("{hash}  {dir_name}\n"))
            .await
            .fs_context("writing checksum", &path)?;
        log::info!("wrote {}", path.display());
        Ok(())
    }
}

/// Resolves target names from the command line or configuration.
pub fn target_by_name(name: &str) -> Option<std::sync::Arc<dyn Target>> {
    match name {
        "dir" => Some(std::sync::Arc::new(DirTarget)),
        "checksum" | "sha256" => Some(std::sync::Arc::new(ChecksumTarget)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_checksum_target_writes_file() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("linux-unpacked");
        std::fs::create_dir_all(&out).unwrap();
        std::fs::write(out.join("a.txt"), "a").unwrap();

        ChecksumTarget.build(&out, Arch::X64).await.unwrap();
        let written = std::fs::read_to_string(tmp.path().join("linux-unpacked.sha256")).unwrap();
        assert!(written.ends_with("  linux-unpacked\n"));
        assert_eq!(written.split_whitespace().next().unwrap().len(), 64);
    }

    #[test]
    fn test_target_lookup() {
        assert!(target_by_name("dir").unwrap().concurrency_safe());
        assert!(!target_by_name("checksum").unwrap().concurrency_safe());
        assert!(target_by_name("nsis").is_none());
    }
}
