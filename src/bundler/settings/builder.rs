//! Builder for constructing Settings.

use super::{Arch, BundleSettings, PackageSettings, Settings};
use crate::bundler::error::{Context, Error};
use crate::bundler::platform::Platform;
use path_absolutize::Absolutize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Builder for constructing [`Settings`].
///
/// Validates required fields, the version string and deprecated options.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_package::bundler::{Arch, PackageSettings, Platform, SettingsBuilder};
///
/// # fn example() -> kodegen_bundler_package::bundler::Result<()> {
/// let settings = SettingsBuilder::new()
///     .app_dir("app")
///     .output_dir("dist")
///     .platform(Platform::Windows)
///     .archs(vec![Arch::X64, Arch::Ia32])
///     .package_settings(PackageSettings {
///         name: "my-app".into(),
///         product_name: "My App".into(),
///         version: "1.0.0".into(),
///         ..Default::default()
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct SettingsBuilder {
    package_settings: Option<PackageSettings>,
    bundle_settings: BundleSettings,
    project_dir: Option<PathBuf>,
    app_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    platform: Option<Platform>,
    archs: Vec<Arch>,
    prepackaged: Option<PathBuf>,
}

impl SettingsBuilder {
    /// Creates a new settings builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets package metadata.
    ///
    /// # Required
    pub fn package_settings(mut self, settings: PackageSettings) -> Self {
        self.package_settings = Some(settings);
        self
    }

    /// Sets packaging configuration.
    ///
    /// Default: empty [`BundleSettings`]
    pub fn bundle_settings(mut self, settings: BundleSettings) -> Self {
        self.bundle_settings = settings;
        self
    }

    /// Sets the project directory.
    ///
    /// Default: parent of the app directory
    pub fn project_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.project_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the staged application directory.
    ///
    /// # Required
    pub fn app_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.app_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the root output directory.
    ///
    /// # Required
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the target platform.
    ///
    /// Default: the host platform
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Sets the architectures to package.
    ///
    /// Default: the host architecture
    pub fn archs(mut self, archs: Vec<Arch>) -> Self {
        self.archs = archs;
        self
    }

    /// Uses an already packaged application directory; the pipeline is skipped.
    pub fn prepackaged<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.prepackaged = Some(path.as_ref().to_path_buf());
        self
    }

    /// Builds the settings.
    ///
    /// # Errors
    ///
    /// - `GenericError` if `package_settings`, `app_dir` or `output_dir` is missing
    /// - `Configuration` for an invalid version, empty name, deprecated option
    ///   or non-table `extra_metadata`
    pub fn build(self) -> crate::bundler::Result<Settings> {
        let package = self
            .package_settings
            .context("package_settings is required")?;
        let app_dir = absolute(&self.app_dir.context("app_dir is required")?)?;
        let output_dir = absolute(&self.output_dir.context("output_dir is required")?)?;

        if package.name.trim().is_empty() {
            return Err(Error::Configuration(
                "package name is empty; set \"name\" in package.json".into(),
            ));
        }
        semver::Version::parse(&package.version).map_err(|e| {
            Error::Configuration(format!(
                "invalid version \"{}\": {e}; versions must be semver (e.g. 1.2.3)",
                package.version
            ))
        })?;

        if let Some((option, replacement)) = self.bundle_settings.deprecated_options().first() {
            return Err(Error::Configuration(format!(
                "\"{option}\" is deprecated and no longer supported; use \"{replacement}\" instead"
            )));
        }

        if let Some(extra) = &self.bundle_settings.extra_metadata
            && !extra.is_object()
        {
            return Err(Error::Configuration(
                "\"extra_metadata\" must be a table of fields to merge into package.json".into(),
            ));
        }

        let project_dir = match self.project_dir {
            Some(dir) => absolute(&dir)?,
            None => app_dir
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| app_dir.clone()),
        };

        let mut archs = self.archs;
        if archs.is_empty() {
            archs.push(Arch::host());
        }
        let mut seen = HashSet::new();
        archs.retain(|arch| seen.insert(*arch));

        let prepackaged = self.prepackaged.as_deref().map(absolute).transpose()?;

        Ok(Settings::new(
            package,
            self.bundle_settings,
            project_dir,
            app_dir,
            output_dir,
            self.platform.unwrap_or_else(Platform::host),
            archs,
            prepackaged,
        ))
    }
}

fn absolute(path: &Path) -> crate::bundler::Result<PathBuf> {
    Ok(path.absolutize()?.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> PackageSettings {
        PackageSettings {
            name: "app".into(),
            version: "1.0.0".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_app_dir() {
        let err = SettingsBuilder::new()
            .output_dir("/tmp/out")
            .package_settings(package())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("app_dir is required"));
    }

    #[test]
    fn test_invalid_version_is_configuration_error() {
        let err = SettingsBuilder::new()
            .app_dir("/tmp/app")
            .output_dir("/tmp/out")
            .package_settings(PackageSettings {
                version: "one".into(),
                ..package()
            })
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_deprecated_option_rejected() {
        let err = SettingsBuilder::new()
            .app_dir("/tmp/app")
            .output_dir("/tmp/out")
            .package_settings(package())
            .bundle_settings(BundleSettings {
                asar_unpack_dir: Some("natives".into()),
                ..Default::default()
            })
            .build()
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("asar.unpack"));
    }

    #[test]
    fn test_defaults() {
        let settings = SettingsBuilder::new()
            .app_dir("/tmp/project/app")
            .output_dir("/tmp/project/dist")
            .platform(Platform::Linux)
            .package_settings(package())
            .build()
            .unwrap();
        assert_eq!(settings.project_dir(), Path::new("/tmp/project"));
        assert_eq!(settings.build_resources_dir(), Path::new("/tmp/project/build"));
        assert_eq!(settings.archs(), &[Arch::host()]);
        assert!(settings.is_asar());
        assert_eq!(
            settings.app_out_dir(Arch::X64),
            Path::new("/tmp/project/dist/linux-unpacked")
        );
    }

    #[test]
    fn test_repeated_archs_collapse_in_order() {
        let settings = SettingsBuilder::new()
            .app_dir("/tmp/project/app")
            .output_dir("/tmp/project/dist")
            .platform(Platform::Linux)
            .archs(vec![Arch::X64, Arch::Arm64, Arch::X64, Arch::Arm64])
            .package_settings(package())
            .build()
            .unwrap();
        assert_eq!(settings.archs(), &[Arch::X64, Arch::Arm64]);
    }
}
