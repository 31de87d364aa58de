//! Configuration structures for packaging operations.
//!
//! This module provides the configuration types for packaging, including
//! package metadata, file set and archive options, per-platform overrides,
//! and the builder that validates them into [`Settings`].

mod arch;
mod builder;
mod bundle;
mod core;
mod package;

// Re-export all public types
pub use arch::Arch;
pub use builder::SettingsBuilder;
pub use bundle::{AsarSettings, BundleSettings, DependencyMode, FileSetConfig, PlatformOverrides};
pub use core::Settings;
pub use package::{DEFAULT_ENTRY_FILE, PackageSettings};
