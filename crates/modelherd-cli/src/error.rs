//! CLI-specific error types and exit-code mappings.
//!
//! Domain errors from the core propagate through handlers as `anyhow`
//! chains; this module classifies them back into categories so the binary
//! can exit with a meaningful code.

use modelherd_core::{RegistryError, SessionError, SupervisorError};
use thiserror::Error;

/// CLI-facing error categories.
#[derive(Debug, Error)]
pub enum CliError {
    /// The requested executable could not be launched, or died on startup.
    #[error("{0}")]
    Launch(String),

    /// The server did not become ready within the budget.
    #[error("{0}")]
    Readiness(String),

    /// A process could not be terminated and may be orphaned.
    #[error("{0}")]
    Termination(String),

    /// Client-session misuse or failure.
    #[error("{0}")]
    Session(String),

    /// Invalid arguments (e.g. missing template parameter).
    #[error("Invalid arguments: {0}")]
    Usage(String),

    /// Registry misconfiguration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

impl CliError {
    /// Classify an error chain into a CLI category.
    pub fn classify(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<SupervisorError>() {
            return Self::from_supervisor(e);
        }
        if let Some(e) = err.downcast_ref::<SessionError>() {
            return match e {
                SessionError::Supervisor(inner) => Self::from_supervisor(inner),
                _ => Self::Session(e.to_string()),
            };
        }
        if let Some(e) = err.downcast_ref::<RegistryError>() {
            return match e {
                RegistryError::MissingParameter { .. } => Self::Usage(e.to_string()),
                _ => Self::Config(e.to_string()),
            };
        }
        Self::Other(format!("{err:#}"))
    }

    fn from_supervisor(err: &SupervisorError) -> Self {
        match err {
            SupervisorError::Launch { .. } | SupervisorError::ExitedEarly { .. } => {
                Self::Launch(err.to_string())
            }
            SupervisorError::ReadinessTimeout { .. } => Self::Readiness(err.to_string()),
            SupervisorError::Termination { .. } => Self::Termination(err.to_string()),
            SupervisorError::Cancelled => Self::Other(err.to_string()),
        }
    }

    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> i32 {
        match self {
            CliError::Launch(_) | CliError::Termination(_) => 71, // EX_OSERR
            CliError::Readiness(_) => 75,                         // EX_TEMPFAIL
            CliError::Session(_) | CliError::Other(_) => 1,
            CliError::Usage(_) => 2,  // EX_USAGE
            CliError::Config(_) => 78, // EX_CONFIG
        }
    }
}
