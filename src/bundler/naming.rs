//! Artifact file names.
//!
//! Package formats disagree on what to call an architecture: Debian wants
//! `amd64`, RPM wants `x86_64`, and everything else uses the runtime names.
//! [`ArtifactNamer`] expands naming patterns with the alias of the format
//! being produced.

use crate::bundler::{Arch, MacroExpander, Result, Settings};

/// Pattern used when no artifact name is configured.
pub const DEFAULT_ARTIFACT_PATTERN: &str = "${productName}-${version}-${arch}.${ext}";

/// Pattern for names that must only contain `[A-Za-z0-9._-]`.
const SAFE_ARTIFACT_PATTERN: &str = "${name}-${version}-${arch}.${ext}";

/// Architecture name as the package format for `ext` spells it.
pub fn arch_alias(arch: Arch, ext: &str) -> &'static str {
    match (ext, arch) {
        ("deb", Arch::X64) => "amd64",
        ("deb", Arch::Ia32) => "i386",
        ("deb", Arch::Armv7l) => "armhf",
        ("rpm" | "pacman", Arch::X64) => "x86_64",
        ("rpm" | "pacman", Arch::Ia32) => "i686",
        ("rpm" | "pacman", Arch::Arm64) => "aarch64",
        ("rpm", Arch::Armv7l) => "armv7hl",
        ("pacman", Arch::Armv7l) => "armv7h",
        ("AppImage", Arch::X64) => "x86_64",
        ("AppImage", Arch::Ia32) => "i386",
        _ => arch.name(),
    }
}

/// Whether every character of `name` is accepted by strict distribution hosts.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Expands artifact naming patterns for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNamer {
    expander: MacroExpander,
    pattern: String,
}

impl ArtifactNamer {
    /// Creates a namer using `pattern`, or the default pattern.
    pub fn new(expander: MacroExpander, pattern: Option<&str>) -> Self {
        Self {
            expander,
            pattern: pattern.unwrap_or(DEFAULT_ARTIFACT_PATTERN).to_string(),
        }
    }

    /// Creates a namer from the configured (platform-specific) pattern.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            MacroExpander::from_settings(settings),
            settings.artifact_name_pattern(),
        )
    }

    /// Pattern this namer expands.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Artifact file name for `ext` and `arch`.
    ///
    /// With `skip_arch_if_default`, the arch segment (and its leading
    /// separator) disappears for the default architecture.
    pub fn name(&self, ext: &str, arch: Arch, skip_arch_if_default: bool) -> Result<String> {
        expand_name(&self.expander, &self.pattern, ext, arch, skip_arch_if_default)
    }

    /// Name safe for hosts with restricted file name character sets.
    ///
    /// Returns `suggested` unchanged when it is already safe; otherwise the
    /// package name based pattern with the default architecture suppressed.
    pub fn safe_name(&self, suggested: &str, ext: &str, arch: Arch) -> Result<String> {
        if is_safe_name(suggested) {
            return Ok(suggested.to_string());
        }
        log::debug!("artifact name {suggested:?} has unsafe characters, using package name");
        expand_name(&self.expander, SAFE_ARTIFACT_PATTERN, ext, arch, true)
    }
}

fn expand_name(
    expander: &MacroExpander,
    pattern: &str,
    ext: &str,
    arch: Arch,
    skip_arch_if_default: bool,
) -> Result<String> {
    let arch_name = if skip_arch_if_default && arch.is_default() {
        None
    } else {
        Some(arch_alias(arch, ext))
    };
    expander.expand(pattern, arch_name, &[("ext", ext)])
}
