//! Error types of the command line tool.
//!
//! Every error carries recovery suggestions printed below the message.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for packager operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type of the command line tool
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Packaging errors
    #[error("Packaging error: {0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// A file the command needs is missing or unreadable
    #[error("Cannot read {path}: {reason}")]
    UnreadableFile {
        /// File that was being read
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Unknown target name
    #[error("Unknown target \"{name}\"")]
    UnknownTarget {
        /// Name as given on the command line
        name: String,
    },
}

impl BundlerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            BundlerError::Cli(CliError::UnknownTarget { .. }) => {
                vec!["Available targets: dir, checksum".to_string()]
            }
            BundlerError::Cli(CliError::UnreadableFile { path, .. }) => vec![format!(
                "Check that {} exists and is readable",
                path.display()
            )],
            BundlerError::Cli(CliError::InvalidArguments { .. }) => {
                vec!["Run with --help to see the accepted arguments".to_string()]
            }
            BundlerError::Toml(_) => vec!["Fix the syntax of the packager configuration file".to_string()],
            BundlerError::Bundler(e) if e.is_configuration() => {
                vec!["Adjust the packager configuration and run again".to_string()]
            }
            BundlerError::Bundler(crate::bundler::Error::Tool { tool, .. }) => {
                vec![format!("Make sure {tool} is installed and on PATH")]
            }
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
