//! Code signing of packaged files.
//!
//! Signing itself is delegated to an external tool. [`CommandSigner`] runs it
//! once per file that needs a signature: native modules in the archive's
//! unpacked mirror and executables in the output root.

use super::context::PackContext;
use crate::bundler::{
    Error, Result,
    archive::{UnpackFilter, unpacked_dir},
    files::matcher::is_executable,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Signs a packaged output directory.
#[async_trait]
pub trait Signer: Send + Sync + std::fmt::Debug {
    async fn sign(&self, context: &PackContext, is_asar: bool) -> Result<()>;
}

/// Signs nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSigner;

#[async_trait]
impl Signer for NoopSigner {
    async fn sign(&self, context: &PackContext, _is_asar: bool) -> Result<()> {
        log::debug!("no signer configured for {}", context.platform);
        Ok(())
    }
}

/// Runs `tool args... <file>` for every file to sign.
#[derive(Debug, Clone)]
pub struct CommandSigner {
    pub tool: String,
    pub args: Vec<String>,
}

impl CommandSigner {
    pub fn new(tool: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
        }
    }

    fn locate(&self) -> Result<PathBuf> {
        which::which(&self.tool).map_err(|e| Error::Tool {
            tool: self.tool.clone(),
            message: format!("not found in PATH: {e}"),
        })
    }

    async fn sign_file(&self, tool: &Path, file: &Path) -> Result<()> {
        log::debug!("signing {}", file.display());
        let output = tokio::process::Command::new(tool)
            .args(&self.args)
            .arg(file)
            .output()
            .await
            .map_err(|error| Error::CommandFailed {
                command: self.tool.clone(),
                error,
            })?;

        if !output.status.success() {
            return Err(Error::Tool {
                tool: self.tool.clone(),
                message: format!(
                    "signing {} exited with {}: {}",
                    file.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Signer for CommandSigner {
    async fn sign(&self, context: &PackContext, is_asar: bool) -> Result<()> {
        let tool = self.locate()?;
        let files = {
            let context = context.clone();
            tokio::task::spawn_blocking(move || files_to_sign(&context, is_asar)).await??
        };
        log::info!("signing {} files with {}", files.len(), self.tool);
        for file in files {
            self.sign_file(&tool, &file).await?;
        }
        Ok(())
    }
}

/// Native files in the unpacked mirror, then executables directly in the output root.
fn files_to_sign(context: &PackContext, is_asar: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if is_asar && let Some(archive) = &context.archive {
        let mirror = unpacked_dir(archive);
        if mirror.is_dir() {
            let native = UnpackFilter::new(&[], true)?;
            for relative in crate::bundler::utils::fs::list_files_sorted(&mirror)? {
                if native.is_unpacked(&relative) {
                    files.push(mirror.join(relative));
                }
            }
        }
    }

    if context.app_out_dir.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(&context.app_out_dir)?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let metadata = entry.metadata()?;
            if metadata.is_file() && is_executable(&metadata) {
                files.push(entry.path());
            }
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::{Arch, MacroExpander, Platform, naming::ArtifactNamer};
    use tempfile::TempDir;

    fn namer() -> ArtifactNamer {
        ArtifactNamer::new(MacroExpander::new("App", "app", "1.0.0", Platform::Linux), None)
    }

    #[tokio::test]
    async fn test_missing_tool_is_tool_error() {
        let signer = CommandSigner::new("kodegen-no-such-signing-tool", vec![]);
        let context = PackContext {
            app_out_dir: PathBuf::from("/nonexistent"),
            resources_dir: PathBuf::from("/nonexistent/resources"),
            arch: Arch::X64,
            platform: Platform::Linux,
            targets: vec![],
            product_name: "App".into(),
            archive: None,
            icon: None,
            artifact_namer: namer(),
        };
        let err = signer.sign(&context, false).await.unwrap_err();
        assert!(matches!(err, Error::Tool { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_files_to_sign() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("linux-unpacked");
        let resources = out.join("resources");
        let mirror = resources.join("app.asar.unpacked/lib");
        std::fs::create_dir_all(&mirror).unwrap();
        std::fs::write(mirror.join("native.node"), "n").unwrap();
        std::fs::write(mirror.join("data.json"), "{}").unwrap();
        std::fs::write(out.join("app"), "bin").unwrap();
        std::fs::set_permissions(out.join("app"), std::fs::Permissions::from_mode(0o755)).unwrap();
        std::fs::write(out.join("LICENSE"), "text").unwrap();

        let context = PackContext {
            app_out_dir: out.clone(),
            resources_dir: resources.clone(),
            arch: Arch::X64,
            platform: Platform::Linux,
            targets: vec![],
            product_name: "App".into(),
            archive: Some(resources.join("app.asar")),
            icon: None,
            artifact_namer: namer(),
        };
        let files = files_to_sign(&context, true).unwrap();
        assert_eq!(files, vec![mirror.join("native.node"), out.join("app")]);
    }
}
