//! Packaging orchestration and coordination.
//!
//! This module provides the main [`Packager`] orchestrator that runs the
//! packaging pipeline for each architecture and builds the targets.
//!
//! # Module Organization
//!
//! - [`checksum`] - SHA-256 of output files and directories
//! - [`context`] - [`PackContext`] handed to collaborators
//! - [`hooks`] - stage preparation and after-pack / after-sign hooks
//! - [`pipeline`] - the per-architecture state machine
//! - [`orchestrator`] - [`Packager`], running all architectures
//! - [`sanity`] - post-pack verification of the entry point
//! - [`signing`] - code signing of packaged files

pub mod checksum;
pub mod context;
pub mod hooks;
pub mod orchestrator;
pub mod pipeline;
pub mod sanity;
pub mod signing;

pub use context::PackContext;
pub use hooks::{CopyRuntimeStage, FnHook, NoopStage, PackHook, StagePreparer};
pub use orchestrator::Packager;
pub use pipeline::{Collaborators, PackOutcome, PackReport, PackStage, PlatformPackager};
pub use signing::{CommandSigner, NoopSigner, Signer};
