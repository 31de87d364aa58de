//! Error types for packaging operations.
//!
//! Provides contextual error chaining, filesystem-specific errors with path
//! context, and the variants the packaging pipeline distinguishes:
//!
//! - **Configuration**: user-fixable problems (bad resource path, deprecated
//!   option, unknown macro, missing entry file after packaging)
//! - **I/O**: filesystem read/write failures, missing expected directories
//! - **Tool**: an external tool (signer, icon converter) reported a failure
//! - **Cancelled**: not a failure; a cooperative early-exit signal
//!
//! # Example
//!
//! ```no_run
//! use kodegen_bundler_package::bundler::{Context, ErrorExt, Result};
//! use std::path::Path;
//!
//! fn read_descriptor(path: &Path) -> Result<serde_json::Value> {
//!     let contents = std::fs::read_to_string(path)
//!         .fs_context("reading package descriptor", path)?;
//!     let value = serde_json::from_str(&contents)
//!         .map_err(kodegen_bundler_package::bundler::Error::from)
//!         .context("parsing package descriptor")?;
//!     Ok(value)
//! }
//! ```

use std::{
    fmt::Display,
    io,
    path::{self, PathBuf},
};
use thiserror::Error as DeriveError;

/// Errors returned by the packager.
#[derive(Debug, DeriveError)]
#[non_exhaustive]
pub enum Error {
    /// Error with context. Created by the [`Context`] trait.
    #[error("{0}: {1}")]
    Context(String, Box<Self>),

    /// File system error with path context.
    ///
    /// Created by the [`ErrorExt`] trait's `fs_context` method.
    #[error("{context} {path}: {error}")]
    Fs {
        /// Context describing the operation (e.g., "reading file")
        context: &'static str,
        /// Path that was being accessed
        path: PathBuf,
        /// The underlying I/O error
        error: io::Error,
    },

    /// User-fixable configuration problem.
    ///
    /// The message names the offending path or option and, where known,
    /// how to fix it.
    #[error("{0}")]
    Configuration(String),

    /// A naming or path pattern references a placeholder nobody provides.
    #[error("unknown macro ${{{name}}} in pattern \"{pattern}\"")]
    UnknownMacro {
        /// Placeholder name as written in the pattern
        name: String,
        /// The full pattern being expanded
        pattern: String,
    },

    /// External tool ran but reported an error or produced unusable output.
    #[error("{tool} failed: {message}")]
    Tool {
        /// Tool name (e.g. "codesign", "icon converter")
        tool: String,
        /// What went wrong
        message: String,
    },

    /// Child process could not be started.
    #[error("failed to run command {command}: {error}")]
    CommandFailed {
        /// Command that failed to execute
        command: String,
        /// The underlying error
        error: io::Error,
    },

    /// The build was cancelled. Pipelines treat this as a normal stop.
    #[error("packaging cancelled")]
    Cancelled,

    /// Generic I/O error.
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Error walking a directory tree.
    #[error("{0}")]
    WalkdirError(#[from] walkdir::Error),

    /// Path prefix stripping error.
    #[error("{0}")]
    StripError(#[from] path::StripPrefixError),

    /// Invalid glob pattern.
    #[error("{0}")]
    GlobPattern(#[from] glob::PatternError),

    /// JSON serialization/deserialization error.
    #[error("{0}")]
    JsonError(#[from] serde_json::error::Error),

    /// TOML configuration parse error.
    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    /// A spawned task panicked or was aborted.
    #[error("task failed to complete: {0}")]
    JoinError(#[from] tokio::task::JoinError),

    /// Generic error with custom message.
    #[error("{0}")]
    GenericError(String),
}

impl Error {
    /// Whether this error is the cancellation signal, looking through context.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Context(_, inner) => inner.is_cancelled(),
            _ => false,
        }
    }

    /// Whether the user can fix this error by changing configuration.
    pub fn is_configuration(&self) -> bool {
        match self {
            Error::Configuration(_) | Error::UnknownMacro { .. } => true,
            Error::Context(_, inner) => inner.is_configuration(),
            _ => false,
        }
    }
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;

/// Trait for adding context to errors.
///
/// Attaches context to errors of the packager's Error type.
/// Works with both `Result<T, E>` and `Option<T>`.
pub trait Context<T> {
    /// Add context to an error.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static;

    /// Add context to an error using a closure (lazy evaluation).
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> Context<T> for Result<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|e| Error::Context(context.to_string(), Box::new(e)))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| Error::Context(f().to_string(), Box::new(e)))
    }
}

impl<T> Context<T> for Option<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
    {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.ok_or_else(|| Error::GenericError(f().to_string()))
    }
}

/// Extension trait for filesystem operations with automatic path context.
pub trait ErrorExt<T> {
    /// Add filesystem context to an I/O error.
    ///
    /// The `context` should be a present-tense verb phrase describing the operation,
    /// e.g., "reading file", "creating directory", "copying file".
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.into(),
            error,
        })
    }
}

/// Macro for early return with error.
///
/// Converts the message into a [`Error::GenericError`] and returns immediately.
///
/// ```ignore
/// bail!("operation failed");
/// bail!("invalid value: {}", value);
/// ```
#[macro_export]
macro_rules! bail {
    ($msg:literal $(,)?) => {
        return Err($crate::bundler::Error::GenericError(format!($msg)))
    };
    ($err:expr $(,)?) => {
        return Err($crate::bundler::Error::GenericError($err.to_string()))
    };
    ($fmt:expr, $($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($fmt, $($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_seen_through_context() {
        let err: Result<()> = Err(Error::Cancelled);
        let err = err.context("copying files").unwrap_err();
        assert!(err.is_cancelled());
        assert!(!err.is_configuration());
    }

    #[test]
    fn test_unknown_macro_message() {
        let err = Error::UnknownMacro {
            name: "foo".into(),
            pattern: "${foo}-x".into(),
        };
        assert_eq!(err.to_string(), "unknown macro ${foo} in pattern \"${foo}-x\"");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_fs_context_includes_path() {
        let res: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.fs_context("reading file", "/tmp/x").unwrap_err();
        assert_eq!(err.to_string(), "reading file /tmp/x: gone");
    }
}
