//! Error types for poudriere operations.

use std::path::PathBuf;
use thiserror::Error;

/// Categories of poudriere errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// `poudriere` could not be started
    ToolNotFound,
    /// A file or jail the operation depends on is missing
    Precondition,
    /// The command ran and failed
    CommandFailed,
    /// Filesystem error
    Io,
}

impl ErrorCategory {
    /// Whether the whole operation has to be abandoned.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolNotFound | Self::Io)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "poudriere not installed",
            Self::Precondition => "Precondition not met",
            Self::CommandFailed => "poudriere command failed",
            Self::Io => "Filesystem error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "Install poudriere: pkg install poudriere",
            Self::Precondition => "Check poudriere.config_file and the jail name",
            Self::CommandFailed => "Run the poudriere command by hand to see the full log",
            Self::Io => "Check permissions on poudriere.config_dir",
        }
    }
}

/// Errors that can occur during poudriere operations.
#[derive(Debug, Error)]
pub enum Error {
    /// poudriere is not installed or not in PATH
    #[error("poudriere not found. Install it with: pkg install poudriere")]
    PoudriereNotFound,

    /// Main configuration file missing
    #[error("could not find {} on file system", path.display())]
    ConfigMissing {
        /// Expected location of poudriere.conf
        path: PathBuf,
    },

    /// Jail does not exist
    #[error("could not find jail {name}")]
    JailNotFound {
        /// Jail name
        name: String,
    },

    /// Package list for a bulk build missing
    #[error("could not find file {} on filesystem", path.display())]
    PackageListNotFound {
        /// Package list path
        path: PathBuf,
    },

    /// Jail name rejected before any command ran
    #[error("invalid jail name: {0}")]
    InvalidName(String),

    /// Bulk build finished without a summary line
    #[error("there may have been an issue building packages")]
    BulkBuildFailed {
        /// Full build output
        output: String,
    },

    /// The jail command succeeded but its make.conf could not be updated
    #[error("could not update {}: {source}", path.display())]
    MakeConf {
        /// make.conf location
        path: PathBuf,
        /// Underlying filesystem error
        source: std::io::Error,
    },

    /// Command ran and exited non-zero
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::PoudriereNotFound => ErrorCategory::ToolNotFound,
            Error::ConfigMissing { .. }
            | Error::JailNotFound { .. }
            | Error::PackageListNotFound { .. }
            | Error::InvalidName(_) => ErrorCategory::Precondition,
            Error::BulkBuildFailed { .. }
            | Error::CommandFailed { .. }
            | Error::MakeConf { .. } => ErrorCategory::CommandFailed,
            Error::Io(_) => ErrorCategory::Io,
        }
    }

    /// Whether the error must abort the whole call.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal()
    }

    /// Whether the error is a refusal issued before any command ran.
    pub fn is_precondition(&self) -> bool {
        self.category() == ErrorCategory::Precondition
    }
}

/// Result type for poudriere operations.
pub type Result<T> = std::result::Result<T, Error>;
