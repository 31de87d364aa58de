//! CPU architecture types and utilities.

use std::fmt;
use std::str::FromStr;

/// CPU architecture of the packaged application.
///
/// Names follow the desktop-runtime convention (`x64`, `ia32`, `arm64`,
/// `armv7l`, `universal`), which is also what the `${arch}` macro expands to
/// unless an artifact format asks for its own alias (see
/// [`crate::bundler::naming`]).
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_package::bundler::Arch;
///
/// let arch: Arch = "arm64".parse().unwrap();
/// assert_eq!(arch.name(), "arm64");
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// x86_64 / AMD64 (64-bit)
    #[serde(alias = "x86_64", alias = "amd64")]
    X64,
    /// x86 / i686 (32-bit)
    #[serde(alias = "x86", alias = "i686")]
    Ia32,
    /// AArch64 / ARM64 (64-bit)
    #[serde(alias = "aarch64")]
    Arm64,
    /// ARMv7 hard-float (32-bit)
    #[serde(alias = "armhf")]
    Armv7l,
    /// macOS universal binary - contains both x64 and arm64
    Universal,
}

impl Arch {
    /// Canonical architecture name.
    pub fn name(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Ia32 => "ia32",
            Arch::Arm64 => "arm64",
            Arch::Armv7l => "armv7l",
            Arch::Universal => "universal",
        }
    }

    /// The architecture artifacts are built for when nobody asks otherwise.
    ///
    /// Used to suppress the arch segment in output directory and artifact names.
    pub fn default_arch() -> Arch {
        Arch::X64
    }

    /// Whether this is the default architecture.
    pub fn is_default(&self) -> bool {
        *self == Self::default_arch()
    }

    /// Architecture of the running host.
    pub fn host() -> Arch {
        match std::env::consts::ARCH {
            "x86" => Arch::Ia32,
            "aarch64" => Arch::Arm64,
            "arm" => Arch::Armv7l,
            _ => Arch::X64,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Arch {
    type Err = crate::bundler::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x64" | "x86_64" | "amd64" => Ok(Arch::X64),
            "ia32" | "x86" | "i686" | "i386" => Ok(Arch::Ia32),
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "armv7l" | "armhf" => Ok(Arch::Armv7l),
            "universal" => Ok(Arch::Universal),
            other => Err(crate::bundler::Error::Configuration(format!(
                "unsupported architecture \"{other}\" (expected one of: x64, ia32, arm64, armv7l, universal)"
            ))),
        }
    }
}
