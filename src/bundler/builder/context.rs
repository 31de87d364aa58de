//! Build context handed to collaborators.

use crate::bundler::{Arch, Platform, Result, naming::ArtifactNamer, resources::ResolvedIcon};
use std::path::PathBuf;

/// Everything a stage preparer, hook or signer knows about one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackContext {
    /// Output directory of this architecture.
    pub app_out_dir: PathBuf,
    /// Directory receiving the application and extra resources.
    pub resources_dir: PathBuf,
    pub arch: Arch,
    pub platform: Platform,
    /// Names of the targets that will be built from this directory.
    pub targets: Vec<String>,
    pub product_name: String,
    /// Archive path when the application is packed.
    pub archive: Option<PathBuf>,
    /// Application icon, when one was found.
    pub icon: Option<ResolvedIcon>,
    /// Names artifacts built from this directory.
    pub artifact_namer: ArtifactNamer,
}

impl PackContext {
    /// Whether the application is packed into an archive.
    pub fn is_asar(&self) -> bool {
        self.archive.is_some()
    }

    /// Artifact file name with extension `ext` for this architecture.
    ///
    /// The arch segment is left out for the default architecture.
    pub fn artifact_name(&self, ext: &str) -> Result<String> {
        self.artifact_namer.name(ext, self.arch, true)
    }
}
