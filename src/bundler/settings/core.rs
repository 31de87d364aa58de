//! Core Settings struct and implementations.

use super::{Arch, BundleSettings, FileSetConfig, PackageSettings, PlatformOverrides};
use crate::bundler::platform::Platform;
use std::path::{Path, PathBuf};

/// Main settings for packaging operations.
///
/// Constructed via [`SettingsBuilder`](super::SettingsBuilder), immutable afterwards.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_package::bundler::{PackageSettings, Platform, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_package::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .app_dir("app")
///     .output_dir("dist")
///     .platform(Platform::Linux)
///     .package_settings(PackageSettings {
///         name: "my-app".into(),
///         version: "1.0.0".into(),
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Settings {
    package: PackageSettings,
    bundle_settings: BundleSettings,
    project_dir: PathBuf,
    app_dir: PathBuf,
    output_dir: PathBuf,
    platform: Platform,
    archs: Vec<Arch>,
    prepackaged: Option<PathBuf>,
}

impl Settings {
    /// Returns the product name.
    pub fn product_name(&self) -> &str {
        self.package.display_name()
    }

    /// Returns the package name.
    pub fn package_name(&self) -> &str {
        &self.package.name
    }

    /// Returns the version string.
    pub fn version_string(&self) -> &str {
        &self.package.version
    }

    /// Returns the package metadata.
    pub fn package(&self) -> &PackageSettings {
        &self.package
    }

    /// Returns the packaging configuration.
    pub fn bundle_settings(&self) -> &BundleSettings {
        &self.bundle_settings
    }

    /// Directory the configuration and build resources are relative to.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Staged application directory (contains `package.json`).
    pub fn app_dir(&self) -> &Path {
        &self.app_dir
    }

    /// Root output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target platform.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Architectures to package.
    pub fn archs(&self) -> &[Arch] {
        &self.archs
    }

    /// Already-packaged application directory, if the caller supplied one.
    pub fn prepackaged(&self) -> Option<&Path> {
        self.prepackaged.as_deref()
    }

    /// Whether the application is packed into a single-file archive.
    pub fn is_asar(&self) -> bool {
        self.bundle_settings.asar.enabled
    }

    /// Build resources directory (`<project>/build` unless configured).
    pub fn build_resources_dir(&self) -> PathBuf {
        match &self.bundle_settings.build_resources {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => self.project_dir.join(dir),
            None => self.project_dir.join("build"),
        }
    }

    /// Output directory of the unpacked application for one architecture.
    pub fn app_out_dir(&self, arch: Arch) -> PathBuf {
        self.output_dir.join(self.platform.unpacked_dir_name(arch))
    }

    /// Overrides for the target platform.
    pub fn platform_overrides(&self) -> &PlatformOverrides {
        match self.platform {
            Platform::Linux => &self.bundle_settings.linux,
            Platform::MacOs => &self.bundle_settings.mac,
            Platform::Windows => &self.bundle_settings.win,
        }
    }

    /// App file patterns, shared then platform-specific.
    pub fn file_patterns(&self) -> Vec<String> {
        self.bundle_settings
            .files
            .iter()
            .chain(self.platform_overrides().files.iter())
            .cloned()
            .collect()
    }

    /// Extra resource sets, shared then platform-specific.
    pub fn extra_resources(&self) -> Vec<FileSetConfig> {
        self.bundle_settings
            .extra_resources
            .iter()
            .chain(self.platform_overrides().extra_resources.iter())
            .cloned()
            .collect()
    }

    /// Extra file sets, shared then platform-specific.
    pub fn extra_files(&self) -> Vec<FileSetConfig> {
        self.bundle_settings
            .extra_files
            .iter()
            .chain(self.platform_overrides().extra_files.iter())
            .cloned()
            .collect()
    }

    /// Artifact naming pattern, if one is configured.
    pub fn artifact_name_pattern(&self) -> Option<&str> {
        self.platform_overrides()
            .artifact_name
            .as_deref()
            .or(self.bundle_settings.artifact_name.as_deref())
    }

    /// Configured icon path, platform override first.
    pub fn icon(&self) -> Option<&Path> {
        self.platform_overrides()
            .icon
            .as_deref()
            .or(self.bundle_settings.icon.as_deref())
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        package: PackageSettings,
        bundle_settings: BundleSettings,
        project_dir: PathBuf,
        app_dir: PathBuf,
        output_dir: PathBuf,
        platform: Platform,
        archs: Vec<Arch>,
        prepackaged: Option<PathBuf>,
    ) -> Self {
        Self {
            package,
            bundle_settings,
            project_dir,
            app_dir,
            output_dir,
            platform,
            archs,
            prepackaged,
        }
    }
}
