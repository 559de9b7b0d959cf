/// Reasons a header block fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderDecodeError {
    /// The block ends inside a header name (or its length byte).
    #[error("header name truncated at offset {offset}")]
    TruncatedName { offset: usize },

    /// The block ends inside a type tag, value length or value.
    #[error("header value truncated at offset {offset}")]
    TruncatedValue { offset: usize },

    /// A type tag other than string (7).
    #[error("unsupported header type tag {0}")]
    UnsupportedType(u8),

    /// Bytes after a complete entry too few to hold another one.
    #[error("{remaining} trailing bytes after header block")]
    TrailingBytes { remaining: usize },

    /// A name or string value is not valid UTF-8.
    #[error("header at offset {offset} is not valid UTF-8")]
    InvalidUtf8 { offset: usize },
}

/// Reasons a header list cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderEncodeError {
    #[error("header name too long ({len} bytes, max 255)")]
    NameTooLong { len: usize },

    #[error("header value for '{name}' too long ({len} bytes, max 65535)")]
    ValueTooLong { name: String, len: usize },

    #[error("unsupported header type tag {0}")]
    UnsupportedType(u8),
}

/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Fewer bytes than the 16-byte minimum message.
    #[error("message too short ({len} bytes, min 16)")]
    FrameTooShort { len: usize },

    /// CRC32 over the first 8 bytes does not match the stored prelude checksum.
    #[error("prelude checksum invalid (stored {expected:#010x}, computed {actual:#010x})")]
    PreludeChecksumInvalid { expected: u32, actual: u32 },

    /// Declared lengths disagree with the bytes received.
    #[error("length mismatch (declared {declared} bytes, received {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("header decode error: {0}")]
    HeaderDecode(#[from] HeaderDecodeError),

    /// CRC32 over headers and payload does not match the trailing checksum.
    #[error("message checksum invalid (stored {expected:#010x}, computed {actual:#010x})")]
    MessageChecksumInvalid { expected: u32, actual: u32 },

    #[error("header encode error: {0}")]
    HeaderEncode(#[from] HeaderEncodeError),

    /// The message exceeds the configured maximum size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing messages.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete message was received.
    #[error("connection closed (incomplete message)")]
    ConnectionClosed,
}

impl FrameError {
    /// Stable name of the error kind, used when surfacing it as an event.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameError::FrameTooShort { .. } => "FrameTooShort",
            FrameError::PreludeChecksumInvalid { .. } => "PreludeChecksumInvalid",
            FrameError::LengthMismatch { .. } => "LengthMismatch",
            FrameError::HeaderDecode(_) => "HeaderDecodeError",
            FrameError::MessageChecksumInvalid { .. } => "MessageChecksumInvalid",
            FrameError::HeaderEncode(_) => "HeaderEncodeError",
            FrameError::MessageTooLarge { .. } => "MessageTooLarge",
            FrameError::Io(_) => "Io",
            FrameError::ConnectionClosed => "ConnectionClosed",
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
