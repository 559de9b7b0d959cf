//! Well-known header names and values.

use evstream_frame::Headers;

/// Header: kind of message (`event`, `exception` or `error`).
pub const MESSAGE_TYPE: &str = "message-type";
/// Header: event name for `event` messages.
pub const EVENT_TYPE: &str = "event-type";
/// Header: MIME type of the payload.
pub const CONTENT_TYPE: &str = "content-type";
/// Header: classification of an `exception` message.
pub const EXCEPTION_TYPE: &str = "exception-type";
/// Header: classification of an `error` message.
pub const ERROR_CODE: &str = "error-code";
/// Header: human-readable text of an `error` message.
pub const ERROR_MESSAGE: &str = "error-message";

pub const MESSAGE_TYPE_EVENT: &str = "event";
pub const MESSAGE_TYPE_EXCEPTION: &str = "exception";
pub const MESSAGE_TYPE_ERROR: &str = "error";

/// Outbound audio chunk.
pub const AUDIO_EVENT: &str = "AudioEvent";
/// Inbound transcription results.
pub const TRANSCRIPT_EVENT: &str = "TranscriptEvent";

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const JSON: &str = "application/json";

/// Headers of an outbound audio chunk.
pub fn audio_event_headers() -> Headers {
    [
        (MESSAGE_TYPE, MESSAGE_TYPE_EVENT),
        (EVENT_TYPE, AUDIO_EVENT),
        (CONTENT_TYPE, OCTET_STREAM),
    ]
    .into_iter()
    .collect()
}

/// Headers of a transcription result message, as the remote side sends them.
pub fn transcript_event_headers() -> Headers {
    [
        (MESSAGE_TYPE, MESSAGE_TYPE_EVENT),
        (EVENT_TYPE, TRANSCRIPT_EVENT),
        (CONTENT_TYPE, JSON),
    ]
    .into_iter()
    .collect()
}

/// Headers of a remote exception of the given classification.
pub fn exception_headers(exception_type: &str) -> Headers {
    [
        (MESSAGE_TYPE, MESSAGE_TYPE_EXCEPTION),
        (EXCEPTION_TYPE, exception_type),
        (CONTENT_TYPE, JSON),
    ]
    .into_iter()
    .collect()
}
