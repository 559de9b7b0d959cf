use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Observable outcome of the session, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// Provisional interpretation; a later event with the same result id revises it.
    PartialResult(Transcript),
    /// Settled interpretation of one utterance.
    FinalResult(Transcript),
    /// A rejected frame, a remote exception or a transport failure.
    /// The session stays open.
    Error(SessionError),
    /// Terminal notification, emitted exactly once.
    Closed,
}

impl SessionEvent {
    /// The transcript carried by a result event.
    pub fn transcript(&self) -> Option<&Transcript> {
        match self {
            SessionEvent::PartialResult(t) | SessionEvent::FinalResult(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, SessionEvent::PartialResult(_))
    }

    pub fn is_final(&self) -> bool {
        matches!(self, SessionEvent::FinalResult(_))
    }
}

/// JSON payload of a `TranscriptEvent` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptEvent {
    #[serde(default)]
    pub transcript: Transcript,
}

/// The result list of one transcript event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transcript {
    #[serde(default)]
    pub results: Vec<TranscriptResult>,
}

impl Transcript {
    /// The result that decides whether the event is partial or final.
    pub fn first_result(&self) -> Option<&TranscriptResult> {
        self.results.first()
    }
}

/// One interpretation of a time range of audio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TranscriptResult {
    /// Stable across the partial revisions and the final version of one utterance.
    #[serde(default)]
    pub result_id: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    #[serde(default)]
    pub is_partial: bool,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    /// Fields not modelled above, kept as received.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TranscriptResult {
    /// Text of the top-ranked alternative.
    pub fn best_transcript(&self) -> Option<&str> {
        self.alternatives.first().map(|a| a.transcript.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Alternative {
    #[serde(default)]
    pub transcript: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A word or punctuation mark within an alternative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub start_time: f64,
    #[serde(default)]
    pub end_time: f64,
    #[serde(default, rename = "Type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
