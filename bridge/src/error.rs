//! Error types for the command bridge

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the command bridge
#[derive(Debug, Error)]
pub enum Error {
    // Request errors (1000-1999)
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Origin not allowed: {0}")]
    OriginRejected(String),

    // Module errors (3000-3999)
    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid module id: {0}")]
    InvalidModuleId(String),

    #[error("File access failed: {0}")]
    FileAccess(String),

    // Shell errors (4000-4999)
    #[error("Elevated shell unavailable: {0}")]
    ShellUnavailable(String),

    #[error("Shell launch failed: {0}")]
    ShellLaunchFailed(String),

    #[error("Shell session closed")]
    SessionClosed,

    #[error("Process execution failed: {0}")]
    ProcessExecutionFailed(String),

    // View errors (5000-5999)
    #[error("View detached")]
    ViewDetached,

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // Request errors (1000-1999)
            Error::InvalidOptions(_) => 1001,
            Error::InvalidCallback(_) => 1002,
            Error::InvalidParameter(_) => 1003,
            Error::OriginRejected(_) => 1004,

            // Module errors (3000-3999)
            Error::ModuleNotFound(_) => 3001,
            Error::InvalidModuleId(_) => 3002,
            Error::FileAccess(_) => 3003,

            // Shell errors (4000-4999)
            Error::ShellUnavailable(_) => 4001,
            Error::ShellLaunchFailed(_) => 4002,
            Error::SessionClosed => 4003,
            Error::ProcessExecutionFailed(_) => 4004,

            // View errors (5000-5999)
            Error::ViewDetached => 5001,

            Error::Internal(_) => 1999,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidOptions(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}
