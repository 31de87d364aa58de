//! Target platforms and their output layouts.
//!
//! | Platform | Resources dir | Unpacked dir |
//! |----------|---------------|--------------|
//! | Linux | `<out>/resources` | `linux[-arch]-unpacked` |
//! | macOS | `<out>/<Product>.app/Contents/Resources` | `mac[-arch]` |
//! | Windows | `<out>/resources` | `win[-arch]-unpacked` |

use super::Arch;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Operating system the application is packaged for.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Linux distributions
    Linux,
    /// macOS
    #[serde(alias = "mac", alias = "darwin")]
    MacOs,
    /// Windows
    #[serde(alias = "win", alias = "win32")]
    Windows,
}

impl Platform {
    /// Platform of the running host.
    pub fn host() -> Platform {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// Short configuration name, expanded by `${os}`.
    pub fn short_name(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "mac",
            Platform::Windows => "win",
        }
    }

    /// Runtime platform identifier, expanded by `${platform}`.
    pub fn node_name(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::MacOs => "darwin",
            Platform::Windows => "win32",
        }
    }

    /// Name of the per-architecture unpacked output directory.
    ///
    /// The architecture is left out for the default architecture so the
    /// common case stays `linux-unpacked` / `win-unpacked` / `mac`.
    pub fn unpacked_dir_name(&self, arch: Arch) -> String {
        let arch_suffix = if arch.is_default() {
            String::new()
        } else {
            format!("-{}", arch.name())
        };
        match self {
            Platform::MacOs => format!("mac{arch_suffix}"),
            _ => format!("{}{arch_suffix}-unpacked", self.short_name()),
        }
    }

    /// Directory that receives the application archive and extra resources.
    pub fn resources_dir(&self, app_out_dir: &Path, product_name: &str) -> PathBuf {
        match self {
            Platform::MacOs => app_out_dir
                .join(format!("{product_name}.app"))
                .join("Contents")
                .join("Resources"),
            _ => app_out_dir.join("resources"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for Platform {
    type Err = crate::bundler::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Platform::Linux),
            "mac" | "macos" | "darwin" => Ok(Platform::MacOs),
            "win" | "windows" | "win32" => Ok(Platform::Windows),
            other => Err(crate::bundler::Error::Configuration(format!(
                "unsupported platform \"{other}\" (expected one of: linux, mac, win)"
            ))),
        }
    }
}
