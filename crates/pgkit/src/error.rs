//! Error types for PostgreSQL operations.
//!
//! Errors are categorized so callers can tell a hard fault (the client
//! tools are missing) from a refused precondition or a command that ran
//! and failed. Nothing in this crate retries.

use thiserror::Error;

/// Categories of PostgreSQL errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A client tool (psql, createdb, ...) could not be started
    ToolNotFound,
    /// The server could not be reached
    Connection,
    /// The server rejected the credentials
    Authentication,
    /// The object already exists or is busy
    Conflict,
    /// The object does not exist
    NotFound,
    /// The connecting role lacks a privilege
    Permission,
    /// A precondition was unmet; nothing was executed
    Precondition,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether the whole operation has to be abandoned.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ToolNotFound)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "PostgreSQL client tools not installed",
            Self::Connection => "Could not reach the server",
            Self::Authentication => "Authentication failed",
            Self::Conflict => "Object conflict",
            Self::NotFound => "Object not found",
            Self::Permission => "Permission denied",
            Self::Precondition => "Precondition not met",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::ToolNotFound => "Install the PostgreSQL client package (psql, createdb, dropdb)",
            Self::Connection => "Check postgres.host and postgres.port and that the server is running",
            Self::Authentication => "Check postgres.pguser and postgres.pgpassword",
            Self::Conflict => "Terminate other sessions (--force) or pick another name",
            Self::NotFound => "Verify the name; names are case-sensitive",
            Self::Permission => "Connect as a role with the required privilege",
            Self::Precondition => "Create the referenced object first",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur during PostgreSQL operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A client tool is not installed or not in PATH
    #[error("{tool} not found. Install the PostgreSQL client tools")]
    ToolNotFound {
        /// Program that could not be started
        tool: String,
    },

    /// Server unreachable
    #[error("connection failed: {message}")]
    Connection {
        /// Message reported by the client tool
        message: String,
    },

    /// Credentials rejected
    #[error("authentication failed: {message}")]
    Authentication {
        /// Message reported by the client tool
        message: String,
    },

    /// Object already exists
    #[error("already exists: {name}")]
    AlreadyExists {
        /// Name of the conflicting object
        name: String,
    },

    /// Database still has open sessions
    #[error("{name} is being accessed by other users")]
    InUse {
        /// Name of the busy database
        name: String,
    },

    /// Object does not exist
    #[error("does not exist: {name}")]
    DoesNotExist {
        /// Name of the missing object
        name: String,
    },

    /// Privilege missing
    #[error("permission denied: {message}")]
    Permission {
        /// Message reported by the client tool
        message: String,
    },

    /// Template database for a create does not exist
    #[error("template {template} does not exist")]
    MissingTemplate {
        /// Name of the missing template
        template: String,
    },

    /// Resource name rejected before any command ran
    #[error("invalid name: {0}")]
    InvalidName(String),

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

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::ToolNotFound { .. } => ErrorCategory::ToolNotFound,
            Error::Connection { .. } => ErrorCategory::Connection,
            Error::Authentication { .. } => ErrorCategory::Authentication,
            Error::AlreadyExists { .. } | Error::InUse { .. } => ErrorCategory::Conflict,
            Error::DoesNotExist { .. } => ErrorCategory::NotFound,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::MissingTemplate { .. } | Error::InvalidName(_) => ErrorCategory::Precondition,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether the error must abort the whole call rather than become a
    /// failed result.
    pub fn is_fatal(&self) -> bool {
        self.category().is_fatal() || matches!(self, Error::Io(_))
    }

    /// Whether the error is a refusal issued before any command ran.
    pub fn is_precondition(&self) -> bool {
        self.category() == ErrorCategory::Precondition
    }

    /// Create an error from client tool stderr.
    ///
    /// Analyzes stderr to categorize the error appropriately.
    pub fn from_psql_output(tool: &str, stderr: &str, name: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();
        let message = stderr.trim().to_string();
        let name = name.unwrap_or("unknown").to_string();

        if stderr_lower.contains("password authentication failed")
            || stderr_lower.contains("no password supplied")
            || stderr_lower.contains("authentication failed")
            || stderr_lower.contains("fe_sendauth")
        {
            return Error::Authentication { message };
        }

        if stderr_lower.contains("could not connect")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("could not translate host name")
            || stderr_lower.contains("no route to host")
            || stderr_lower.contains("timeout expired")
            || stderr_lower.contains("connection to server")
        {
            return Error::Connection { message };
        }

        if stderr_lower.contains("is being accessed by other users") {
            return Error::InUse { name };
        }

        if stderr_lower.contains("already exists") {
            return Error::AlreadyExists { name };
        }

        if stderr_lower.contains("does not exist") {
            return Error::DoesNotExist { name };
        }

        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("must be owner")
            || stderr_lower.contains("must be superuser")
            || stderr_lower.contains("must have createdb")
            || stderr_lower.contains("insufficient privilege")
        {
            return Error::Permission { message };
        }

        Error::CommandFailed {
            message: format!("{tool} failed for {name}"),
            stderr: message,
        }
    }
}

/// Result type for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, Error>;
