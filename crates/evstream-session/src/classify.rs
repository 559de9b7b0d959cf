//! Interpretation of decoded messages.

use evstream_frame::Message;

use crate::error::SessionError;
use crate::event::{Transcript, TranscriptEvent};
use crate::protocol::{
    ERROR_CODE, ERROR_MESSAGE, EXCEPTION_TYPE, MESSAGE_TYPE, MESSAGE_TYPE_ERROR,
    MESSAGE_TYPE_EXCEPTION,
};

const UNKNOWN_EXCEPTION: &str = "UnknownException";
const UNKNOWN_ERROR: &str = "UnknownError";

/// What a decoded message means to the session owner.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// The remote side reported a failure.
    Error { kind: String, message: String },
    /// The first result is still provisional.
    Partial(Transcript),
    /// The first result is settled.
    Final(Transcript),
    /// Nothing observable, e.g. an empty result list.
    None,
}

/// Classify one decoded message.
///
/// Exceptions are recognised from headers alone. Everything else is read as a
/// transcript payload, and only the first result's `IsPartial` flag decides
/// between partial and final. A payload that is not valid transcript JSON is
/// an error.
pub fn classify(message: &Message) -> Result<Classification, SessionError> {
    match message.headers.get(MESSAGE_TYPE) {
        Some(MESSAGE_TYPE_EXCEPTION) => {
            let kind = message
                .headers
                .get(EXCEPTION_TYPE)
                .unwrap_or(UNKNOWN_EXCEPTION)
                .to_string();
            Ok(Classification::Error {
                kind,
                message: exception_message(&message.payload),
            })
        }
        Some(MESSAGE_TYPE_ERROR) => {
            let kind = message
                .headers
                .get(ERROR_CODE)
                .unwrap_or(UNKNOWN_ERROR)
                .to_string();
            let text = match message.headers.get(ERROR_MESSAGE) {
                Some(text) => text.to_string(),
                None => String::from_utf8_lossy(&message.payload).into_owned(),
            };
            Ok(Classification::Error {
                kind,
                message: text,
            })
        }
        _ => classify_results(&message.payload),
    }
}

fn classify_results(payload: &[u8]) -> Result<Classification, SessionError> {
    if payload.is_empty() {
        return Ok(Classification::None);
    }

    let event: TranscriptEvent = serde_json::from_slice(payload)?;
    let transcript = event.transcript;
    let is_partial = match transcript.first_result() {
        Some(result) => result.is_partial,
        None => return Ok(Classification::None),
    };

    if is_partial {
        Ok(Classification::Partial(transcript))
    } else {
        Ok(Classification::Final(transcript))
    }
}

/// Exception bodies are JSON objects with a `Message` (or `message`) field.
/// Anything else is reported as text.
fn exception_message(payload: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(body)) = serde_json::from_slice(payload) {
        let field = body.get("Message").or_else(|| body.get("message"));
        if let Some(serde_json::Value::String(text)) = field {
            return text.clone();
        }
    }
    String::from_utf8_lossy(payload).into_owned()
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use evstream_frame::Headers;

    use super::*;
    use crate::protocol::{exception_headers, transcript_event_headers};

    fn transcript_message(body: &str) -> Message {
        Message::new(transcript_event_headers(), Bytes::from(body.to_string()))
    }

    #[test]
    fn partial_and_final_follow_first_result() {
        let partial = transcript_message(
            r#"{"Transcript":{"Results":[{"ResultId":"a","IsPartial":true},{"ResultId":"b","IsPartial":false}]}}"#,
        );
        match classify(&partial).unwrap() {
            Classification::Partial(t) => assert_eq!(t.results.len(), 2),
            other => panic!("expected partial, got {other:?}"),
        }

        let settled =
            transcript_message(r#"{"Transcript":{"Results":[{"ResultId":"a","IsPartial":false}]}}"#);
        assert!(matches!(classify(&settled).unwrap(), Classification::Final(_)));
    }

    #[test]
    fn empty_results_are_not_observable() {
        let message = transcript_message(r#"{"Transcript":{"Results":[]}}"#);
        assert_eq!(classify(&message).unwrap(), Classification::None);

        let empty = Message::new(transcript_event_headers(), Bytes::new());
        assert_eq!(classify(&empty).unwrap(), Classification::None);
    }

    #[test]
    fn exception_carries_type_and_message() {
        let message = Message::new(
            exception_headers("BadRequestException"),
            Bytes::from_static(br#"{"Message":"invalid audio"}"#),
        );
        assert_eq!(
            classify(&message).unwrap(),
            Classification::Error {
                kind: "BadRequestException".to_string(),
                message: "invalid audio".to_string(),
            }
        );
    }

    #[test]
    fn exception_without_json_body_uses_text() {
        let headers: Headers = [("message-type", "exception")].into_iter().collect();
        let message = Message::new(headers, Bytes::from_static(b"throttled"));
        assert_eq!(
            classify(&message).unwrap(),
            Classification::Error {
                kind: "UnknownException".to_string(),
                message: "throttled".to_string(),
            }
        );
    }

    #[test]
    fn error_message_type_reads_headers() {
        let headers: Headers = [
            ("message-type", "error"),
            ("error-code", "InternalFailure"),
            ("error-message", "try again"),
        ]
        .into_iter()
        .collect();
        let message = Message::new(headers, Bytes::new());
        assert_eq!(
            classify(&message).unwrap(),
            Classification::Error {
                kind: "InternalFailure".to_string(),
                message: "try again".to_string(),
            }
        );
    }

    #[test]
    fn non_json_result_payload_is_invalid() {
        let message = transcript_message("not json");
        let err = classify(&message).unwrap_err();
        assert!(matches!(err, SessionError::InvalidPayload(_)));
        assert_eq!(err.kind(), "InvalidPayload");
    }
}
