//! Decides which files stay outside the archive body.

use crate::bundler::{Result, files::FileMatcher, files::matcher::to_slash};
use std::path::Path;

/// File name patterns unpacked by smart unpack: native modules and executables.
const SMART_UNPACK_PATTERNS: [&str; 6] = ["*.node", "*.dll", "*.exe", "*.dylib", "*.so", "*.so.*"];

/// Predicate over destination-relative paths.
///
/// Matched files are stored next to the archive in `<archive>.unpacked/`
/// instead of in its body.
#[derive(Debug, Clone)]
pub struct UnpackFilter {
    patterns: FileMatcher,
    smart: FileMatcher,
    smart_enabled: bool,
}

impl UnpackFilter {
    /// Filter from user patterns (matcher syntax, destination-relative).
    pub fn new(patterns: &[String], smart_unpack: bool) -> Result<Self> {
        let smart: Vec<String> = SMART_UNPACK_PATTERNS.iter().map(|p| p.to_string()).collect();
        Ok(Self {
            patterns: FileMatcher::compile(patterns, "", "", None, None)?,
            smart: FileMatcher::compile(&smart, "", "", None, None)?,
            smart_enabled: smart_unpack,
        })
    }

    /// A filter that keeps everything in the body.
    pub fn none() -> Self {
        Self {
            patterns: FileMatcher::empty(),
            smart: FileMatcher::empty(),
            smart_enabled: false,
        }
    }

    /// Whether `destination` goes to the unpacked mirror.
    pub fn is_unpacked(&self, destination: &Path) -> bool {
        let relative = to_slash(destination);
        if self.patterns.is_selected(&relative) {
            return true;
        }
        self.smart_enabled
            && destination
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| self.smart.is_selected(name))
    }
}

/// Destination-relative paths whose content may change after archiving.
#[derive(Debug, Clone)]
pub struct IntegrityExemptions {
    patterns: FileMatcher,
}

impl IntegrityExemptions {
    /// Exemptions from matcher-syntax patterns.
    pub fn new(patterns: &[String]) -> Result<Self> {
        Ok(Self {
            patterns: FileMatcher::compile(patterns, "", "", None, None)?,
        })
    }

    /// No exemptions.
    pub fn none() -> Self {
        Self {
            patterns: FileMatcher::empty(),
        }
    }

    /// Whether `destination` is exempt from hashing.
    pub fn is_exempt(&self, destination: &Path) -> bool {
        self.patterns.is_selected(&to_slash(destination))
    }
}
