//! Error types for the session core

use crate::session::SessionState;
use thiserror::Error;

/// Errors surfaced by the session controller
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VigilError {
    #[error("{event} is not valid while {state}")]
    InvalidTransition {
        state: SessionState,
        event: &'static str,
    },

    #[error("Breach report not found: {0}")]
    UnknownBreach(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Failures of the advisory text collaborator
///
/// Never fatal: callers substitute a fallback message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryError {
    #[error("advisory service unavailable: {0}")]
    Unavailable(String),

    #[error("advisory service timed out after {0}ms")]
    Timeout(u64),
}
