use thiserror::Error;

/// Errors that can occur while driving an analysis session
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("A turn is already in flight for session {0}")]
    TurnInFlight(String),

    #[error("Message is empty")]
    EmptyUtterance,

    #[error("No paper reference supplied")]
    IntakeIncomplete,

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Transport error: {0}")]
    TransportError(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
