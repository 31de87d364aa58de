//! Shared helpers for packager integration tests.
//!
//! Every test works in its own temp directory laid out as a project:
//! `<root>/app` is the staged application and `<root>/dist` the output.

#![allow(dead_code)]

use kodegen_bundler_package::bundler::{Arch, BundleSettings, PackageSettings, Platform, Settings, SettingsBuilder};
use std::path::Path;

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: impl AsRef<[u8]>) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

/// Minimal runnable application: a descriptor and its entry file.
pub fn write_app(root: &Path) {
    write(
        root,
        "app/package.json",
        r#"{"name":"demo","version":"1.0.0","main":"main.js","devDependencies":{"x":"1"}}"#,
    );
    write(root, "app/main.js", "require('./lib/util')");
    write(root, "app/lib/util.js", "module.exports = 1");
}

/// Linux settings for the project at `root`.
pub fn settings(root: &Path, bundle: BundleSettings) -> Settings {
    SettingsBuilder::new()
        .project_dir(root)
        .app_dir(root.join("app"))
        .output_dir(root.join("dist"))
        .platform(Platform::Linux)
        .archs(vec![Arch::X64])
        .package_settings(PackageSettings {
            name: "demo".into(),
            version: "1.0.0".into(),
            ..Default::default()
        })
        .bundle_settings(bundle)
        .build()
        .unwrap()
}
