use thiserror::Error;

/// Authorization failure raised by a guard. Its message reaches the caller verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct GuardError(pub String);

impl GuardError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Failures returned from routing an action to its handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("handler {0} not found")]
    HandlerNotFound(String),

    #[error(transparent)]
    Unauthorized(#[from] GuardError),

    #[error("handler failed: {0}")]
    Handler(String),

    #[error("action type already registered: {0}")]
    DuplicateActionType(String),
}

/// Rejections raised before a stream is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("clientId missing")]
    MissingClientId,

    #[error("clientId is not a valid uuid: {0}")]
    InvalidClientId(String),
}

/// Failures writing a single frame to a single connection.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("transport write failed: {0}")]
    Write(String),

    #[error("transport does not support flushing")]
    FlushUnsupported,

    #[error("transport closed")]
    Closed,
}
