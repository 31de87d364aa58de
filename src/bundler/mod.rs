//! Packaging pipeline for desktop applications.
//!
//! Turns a staged application directory into a per-architecture output
//! directory ready for installer targets:
//!
//! 1. [`files`] selects what to ship with glob [`FileMatcher`]s
//! 2. [`archive`] packs the application into `app.asar` with an integrity digest
//! 3. [`builder`] runs the pipeline per architecture and schedules [`Target`]s
//! 4. [`tasks`] bounds concurrency and carries cancellation
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_package::bundler::{PackageSettings, Packager, Platform, SettingsBuilder};
//!
//! # async fn example() -> kodegen_bundler_package::bundler::Result<()> {
//! let settings = SettingsBuilder::new()
//!     .app_dir("app")
//!     .output_dir("dist")
//!     .platform(Platform::Linux)
//!     .package_settings(PackageSettings {
//!         name: "my-app".into(),
//!         version: "1.0.0".into(),
//!         ..Default::default()
//!     })
//!     .build()?;
//!
//! let outcomes = Packager::new(settings).pack().await?;
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod builder;
pub mod error;
pub mod files;
pub mod macros;
pub mod naming;
pub mod platform;
pub mod resources;
pub mod settings;
pub mod target;
pub mod tasks;
pub mod utils;

pub use archive::{ARCHIVE_NAME, ArchiveReader, Header, IntegrityRecord, PackedArchive};
pub use builder::{
    CommandSigner, CopyRuntimeStage, FnHook, NoopSigner, NoopStage, PackContext, PackHook, PackOutcome,
    PackReport, PackStage, Packager, Signer, StagePreparer,
};
pub use error::{Context, Error, ErrorExt, Result};
pub use files::{FileMatcher, FileSet};
pub use macros::MacroExpander;
pub use naming::ArtifactNamer;
pub use platform::Platform;
pub use resources::{IconConverter, ImageIconConverter, ResolvedIcon};
pub use settings::{
    Arch, AsarSettings, BundleSettings, DependencyMode, FileSetConfig, PackageSettings, PlatformOverrides,
    Settings, SettingsBuilder,
};
pub use target::{ChecksumTarget, DirTarget, Target, target_by_name};
pub use tasks::TaskManager;
