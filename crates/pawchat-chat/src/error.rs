//! Error types for the chat engine.

/// Failures of a single call to the remote conversation store.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Errors surfaced by the chat session and its components.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message history unavailable: {0}")]
    SyncUnavailable(String),
    #[error("failed to start conversation: {0}")]
    ConversationCreationFailed(String),
    #[error("failed to send message: {0}")]
    SendFailed(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
}
