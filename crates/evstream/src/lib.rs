//! Event-stream framing and streaming transcription sessions.
//!
//! Audio is streamed to a remote recognizer as CRC32-protected binary
//! messages; recognition results come back the same way and are surfaced as
//! partial results, final results, or errors.
//!
//! # Crate Structure
//!
//! - [`transport`]: the transport interface a session runs over (in-memory, Unix sockets)
//! - [`frame`]: checksums, header and message codecs, stream delimitation
//! - [`session`]: the streaming session state machine (behind `session` feature)

/// Re-export transport types.
pub mod transport {
    pub use evstream_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use evstream_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use evstream_session::*;
}
