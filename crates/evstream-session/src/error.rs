use crate::session::SessionState;

/// Errors that can occur in session operations or be surfaced as events.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An inbound message failed validation, or an outbound one could not be encoded.
    #[error("frame error: {0}")]
    Frame(#[from] evstream_frame::FrameError),

    /// The transport refused an operation.
    #[error("transport error: {0}")]
    Transport(#[from] evstream_transport::TransportError),

    /// `send` called before the session is ready or after it started closing.
    #[error("session not open (state: {state:?})")]
    SessionNotOpen { state: SessionState },

    /// The remote side reported an exception or error.
    #[error("{kind}: {message}")]
    Application { kind: String, message: String },

    /// A message payload is not the structured data its headers promise.
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// The transport reported a failure without closing.
    #[error("transport failed: {0}")]
    TransportFailed(String),

    /// The session closed before it became ready.
    #[error("session closed")]
    Closed,
}

impl SessionError {
    /// Classification of the error: the remote exception type for
    /// application errors, the frame error kind for rejected frames.
    pub fn kind(&self) -> &str {
        match self {
            SessionError::Frame(err) => err.kind(),
            SessionError::Transport(err) => err.kind(),
            SessionError::SessionNotOpen { .. } => "SessionNotOpen",
            SessionError::Application { kind, .. } => kind.as_str(),
            SessionError::InvalidPayload(_) => "InvalidPayload",
            SessionError::TransportFailed(_) => "TransportFailed",
            SessionError::Closed => "Closed",
        }
    }

    /// Whether the error was signalled by the remote side.
    pub fn is_remote(&self) -> bool {
        matches!(self, SessionError::Application { .. })
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
