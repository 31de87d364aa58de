//! Packaging pipeline for desktop applications
//!
//! This library turns a staged application directory into ready-to-ship
//! output directories:
//! - selecting files with glob patterns and macro expansion
//! - packing them into a single-file archive with an integrity digest
//! - copying extra resources, verifying the entry point, signing
//! - building distributable targets concurrently, with cancellation
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
