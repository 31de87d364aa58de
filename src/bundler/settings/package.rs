//! Package metadata and configuration.

/// Entry file used when `main` is not set.
pub const DEFAULT_ENTRY_FILE: &str = "index.js";

/// Application metadata used across all packaging steps.
///
/// Usually read from the application's `package.json` by
/// [`crate::metadata::load_app_metadata`].
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_package::bundler::PackageSettings;
///
/// let settings = PackageSettings {
///     name: "my-app".into(),
///     product_name: "My App".into(),
///     version: "1.0.0".into(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSettings {
    /// Package name (machine-friendly, used for safe artifact names).
    pub name: String,

    /// Product name displayed to users.
    ///
    /// Falls back to `name` when empty.
    #[serde(default)]
    pub product_name: String,

    /// Version string in semantic versioning format.
    pub version: String,

    /// Brief description of the application.
    #[serde(default)]
    pub description: String,

    /// Application entry file relative to the app root.
    ///
    /// Default: None (`index.js`)
    #[serde(default)]
    pub main: Option<String>,
}

impl PackageSettings {
    /// Product name, or the package name when no product name is set.
    pub fn display_name(&self) -> &str {
        if self.product_name.is_empty() {
            &self.name
        } else {
            &self.product_name
        }
    }
}
