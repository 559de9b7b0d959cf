//! Streaming session over event-stream framing.
//!
//! A [`StreamingSession`] owns one exchange over a [`Transport`]: it frames
//! outbound audio chunks as `AudioEvent` messages and turns each inbound
//! message into a [`SessionEvent`]: a partial result, a final result, an
//! error, or nothing at all for empty result lists.
//!
//! [`Transport`]: evstream_transport::Transport

pub mod classify;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;

pub use classify::{classify, Classification};
pub use error::{Result, SessionError};
pub use event::{Alternative, Item, SessionEvent, Transcript, TranscriptEvent, TranscriptResult};
pub use protocol::{
    audio_event_headers, exception_headers, transcript_event_headers, AUDIO_EVENT, CONTENT_TYPE,
    EVENT_TYPE, EXCEPTION_TYPE, MESSAGE_TYPE, MESSAGE_TYPE_ERROR, MESSAGE_TYPE_EVENT,
    MESSAGE_TYPE_EXCEPTION, TRANSCRIPT_EVENT,
};
pub use session::{
    Events, SessionConfig, SessionState, SessionStats, StreamingSession, DEFAULT_MAX_CHUNK_SIZE,
};
