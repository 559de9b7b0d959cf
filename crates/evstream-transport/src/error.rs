use std::path::PathBuf;

/// Failures of the byte-unit transport underneath a session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listening socket could not be created at `path`.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No listener answered at `path`.
    #[error("failed to connect to {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to accept connection: {0}")]
    Accept(std::io::Error),

    /// Reading, writing or configuring a connected stream failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Socket paths are limited by `sockaddr_un`.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// The other side is gone and nothing more can be sent to it.
    #[error("transport disconnected")]
    Disconnected,

    /// `close` was already requested on this side.
    #[error("transport shut down")]
    Shutdown,
}

impl TransportError {
    /// Stable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Bind { .. } => "Bind",
            TransportError::Connect { .. } => "Connect",
            TransportError::Accept(_) => "Accept",
            TransportError::Io(_) => "Io",
            TransportError::PathTooLong { .. } => "PathTooLong",
            TransportError::Disconnected => "Disconnected",
            TransportError::Shutdown => "Shutdown",
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
