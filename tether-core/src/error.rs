//! Errors in the library.
use thiserror::Error;

/// Errors in the library.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TetherError {
    /// A payload could not be decoded into an array.
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// Publishing or subscribing failed, or the session is closed.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The action does not match the action space of the environment.
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// The environment failed internally while stepping.
    #[error("Environment fault: {0}")]
    EnvironmentFault(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

impl TetherError {
    /// Returns `true` if the error ends the episode it occurred in.
    ///
    /// A single malformed payload or an invalid action is recovered locally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TetherError::EnvironmentFault(_) | TetherError::TransportError(_)
        )
    }
}
