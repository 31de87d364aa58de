//! Packaging configuration: file sets, archive options and per-platform overrides.

use serde::Deserialize;
use std::path::PathBuf;

/// One group of files copied from `from` into `to`.
///
/// `from` is relative to the project directory and `to` relative to the
/// destination root of the set (resources dir for extra resources, app
/// output root for extra files).
///
/// # Configuration
///
/// ```toml
/// [[extra_resources]]
/// from = "assets"
/// to = "assets"
/// filter = ["**/*", "!**/*.psd"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FileSetConfig {
    /// Source directory. Default: the project directory.
    #[serde(default)]
    pub from: Option<PathBuf>,

    /// Destination directory. Default: the destination root.
    #[serde(default)]
    pub to: Option<PathBuf>,

    /// Glob patterns, `!` negates. Default: everything.
    #[serde(default)]
    pub filter: Vec<String>,
}

impl FileSetConfig {
    /// File set copying `from` to the same relative location.
    pub fn from_dir(from: impl Into<PathBuf>) -> Self {
        let from = from.into();
        Self {
            to: Some(from.clone()),
            from: Some(from),
            filter: Vec::new(),
        }
    }
}

/// How application dependencies (`node_modules`) reach the package.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    /// Collected by a dedicated second pass over `node_modules`.
    #[default]
    Bundled,
    /// Handled by someone else; the packager never touches `node_modules`.
    External,
}

/// Single-file archive options.
///
/// # Configuration
///
/// ```toml
/// [asar]
/// enabled = true
/// smart_unpack = true
/// unpack = ["**/*.node", "assets/videos/**"]
/// integrity_exempt = ["**/*.node"]
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AsarSettings {
    /// Pack the application into `app.asar`. Default: true
    pub enabled: bool,

    /// Automatically unpack native modules and executables. Default: true
    pub smart_unpack: bool,

    /// Extra glob patterns (destination-relative) kept outside the archive.
    pub unpack: Vec<String>,

    /// Destination-relative globs whose content may be modified after
    /// archiving (e.g. signed native modules). Excluded from the integrity digest.
    pub integrity_exempt: Vec<String>,
}

impl Default for AsarSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            smart_unpack: true,
            unpack: Vec::new(),
            integrity_exempt: Vec::new(),
        }
    }
}

/// Per-platform overrides.
///
/// Patterns are appended to the shared lists; scalar options replace them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformOverrides {
    /// Additional app file patterns.
    #[serde(default)]
    pub files: Vec<String>,

    /// Additional extra resources.
    #[serde(default)]
    pub extra_resources: Vec<FileSetConfig>,

    /// Additional extra files.
    #[serde(default)]
    pub extra_files: Vec<FileSetConfig>,

    /// Artifact naming pattern for this platform.
    #[serde(default)]
    pub artifact_name: Option<String>,

    /// Icon for this platform.
    #[serde(default)]
    pub icon: Option<PathBuf>,
}

/// Packaging configuration for all platforms.
///
/// # Configuration
///
/// Usually loaded from `packager.toml` by [`crate::metadata::load_config`]:
///
/// ```toml
/// files = ["**/*", "!**/*.map"]
/// artifact_name = "${productName}-${version}-${arch}.${ext}"
/// icon = "icon.png"
///
/// [[extra_resources]]
/// from = "assets"
/// to = "assets"
///
/// [linux]
/// artifact_name = "${name}_${version}_${arch}.${ext}"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BundleSettings {
    /// App file patterns relative to the app directory.
    ///
    /// Default: empty, meaning `**/*`.
    #[serde(default)]
    pub files: Vec<String>,

    /// Files copied into the resources directory, never archived.
    #[serde(default)]
    pub extra_resources: Vec<FileSetConfig>,

    /// Files copied into the app output root, never archived.
    #[serde(default)]
    pub extra_files: Vec<FileSetConfig>,

    /// Archive options.
    #[serde(default)]
    pub asar: AsarSettings,

    /// Artifact naming pattern.
    ///
    /// Default: `${productName}-${version}-${arch}.${ext}`
    #[serde(default)]
    pub artifact_name: Option<String>,

    /// Fields merged into the packaged `package.json`.
    ///
    /// Must be a table when present.
    #[serde(default)]
    pub extra_metadata: Option<serde_json::Value>,

    /// Icon path, resolved against the build resources directory first.
    #[serde(default)]
    pub icon: Option<PathBuf>,

    /// Build resources directory. Default: `<project>/build`
    #[serde(default)]
    pub build_resources: Option<PathBuf>,

    /// Dependency handling.
    #[serde(default)]
    pub dependencies: DependencyMode,

    /// Linux overrides.
    #[serde(default)]
    pub linux: PlatformOverrides,

    /// macOS overrides.
    #[serde(default)]
    pub mac: PlatformOverrides,

    /// Windows overrides.
    #[serde(default)]
    pub win: PlatformOverrides,

    /// Replaced by `asar.unpack`. Rejected when present.
    #[serde(default)]
    pub asar_unpack_dir: Option<String>,
}

impl BundleSettings {
    /// Names of deprecated options still present, with their replacements.
    pub fn deprecated_options(&self) -> Vec<(&'static str, &'static str)> {
        let mut found = Vec::new();
        if self.asar_unpack_dir.is_some() {
            found.push(("asar_unpack_dir", "asar.unpack"));
        }
        found
    }
}
