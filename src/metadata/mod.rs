//! Application metadata from `package.json` and packager configuration from TOML.

use crate::bundler::{BundleSettings, PackageSettings};
use crate::error::{BundlerError, CliError, Result};
use std::path::Path;

/// Default configuration file name, looked up in the project directory.
pub const CONFIG_FILE: &str = "packager.toml";

/// Reads name, product name, version, description and `main` from
/// `<app_dir>/package.json`.
pub fn load_app_metadata(app_dir: &Path) -> Result<PackageSettings> {
    let path = app_dir.join("package.json");
    let content = std::fs::read_to_string(&path).map_err(|e| {
        BundlerError::Cli(CliError::UnreadableFile {
            path: path.clone(),
            reason: e.to_string(),
        })
    })?;

    let metadata: PackageSettings = serde_json::from_str(&content).map_err(|e| {
        BundlerError::Cli(CliError::InvalidArguments {
            reason: format!("{} is not a valid package descriptor: {e}", path.display()),
        })
    })?;
    log::debug!(
        "loaded {} {} from {}",
        metadata.name,
        metadata.version,
        path.display()
    );
    Ok(metadata)
}

/// Parses a packager configuration file.
pub fn load_config(path: &Path) -> Result<BundleSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BundlerError::Cli(CliError::UnreadableFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    })?;
    Ok(toml::from_str(&content)?)
}

/// Loads `config` when given, otherwise `<project_dir>/packager.toml` if it
/// exists, otherwise defaults.
pub fn discover_config(config: Option<&Path>, project_dir: &Path) -> Result<BundleSettings> {
    if let Some(config) = config {
        return load_config(config);
    }
    let default = project_dir.join(CONFIG_FILE);
    if default.is_file() {
        log::debug!("using configuration {}", default.display());
        return load_config(&default);
    }
    Ok(BundleSettings::default())
}
