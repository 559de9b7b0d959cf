use std::collections::BTreeMap;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use evstream_frame::Message;
use evstream_session::{SessionEvent, Transcript, CONTENT_TYPE, EVENT_TYPE, MESSAGE_TYPE};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// Message payloads only, concatenated.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One decoded message, or the reason it was rejected.
#[derive(Serialize)]
pub struct MessageRow {
    pub index: usize,
    pub wire_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MessageRow {
    pub fn decoded(index: usize, wire_size: usize, message: &Message) -> Self {
        let headers = message
            .headers
            .iter()
            .map(|e| (e.name.clone(), e.value.clone()))
            .collect();
        Self {
            index,
            wire_size,
            headers: Some(headers),
            payload_size: Some(message.payload.len()),
            payload: Some(payload_preview(&message.payload)),
            error: None,
        }
    }

    pub fn rejected(index: usize, wire_size: usize, error: String) -> Self {
        Self {
            index,
            wire_size,
            headers: None,
            payload_size: None,
            payload: None,
            error: Some(error),
        }
    }

    fn header(&self, name: &str) -> String {
        self.headers
            .as_ref()
            .and_then(|h| h.get(name))
            .cloned()
            .unwrap_or_default()
    }
}

pub fn print_messages(rows: &[MessageRow], payloads: &[Vec<u8>], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                print_json(row);
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "MESSAGE TYPE", "EVENT TYPE", "CONTENT TYPE", "SIZE", "PAYLOAD"]);
            for row in rows {
                let (size, payload) = match &row.error {
                    Some(err) => (row.wire_size.to_string(), format!("<rejected: {err}>")),
                    None => (
                        row.payload_size.unwrap_or_default().to_string(),
                        row.payload.clone().unwrap_or_default(),
                    ),
                };
                table.add_row(vec![
                    row.index.to_string(),
                    row.header(MESSAGE_TYPE),
                    row.header(EVENT_TYPE),
                    row.header(CONTENT_TYPE),
                    size,
                    payload,
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                match &row.error {
                    Some(err) => println!("#{} rejected ({} bytes): {err}", row.index, row.wire_size),
                    None => println!(
                        "#{} {}/{} size={} payload={}",
                        row.index,
                        row.header(MESSAGE_TYPE),
                        row.header(EVENT_TYPE),
                        row.payload_size.unwrap_or_default(),
                        row.payload.as_deref().unwrap_or_default()
                    ),
                }
            }
        }
        OutputFormat::Raw => {
            for payload in payloads {
                print_raw(payload);
            }
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript: Option<&'a Transcript>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

pub fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::PartialResult(_) => "partial",
        SessionEvent::FinalResult(_) => "final",
        SessionEvent::Error(_) => "error",
        SessionEvent::Closed => "closed",
    }
}

pub fn print_event(event: &SessionEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let (error_kind, error_message) = match event {
                SessionEvent::Error(err) => (Some(err.kind()), Some(err.to_string())),
                _ => (None, None),
            };
            print_json(&EventOutput {
                event: event_name(event),
                transcript: event.transcript(),
                error_kind,
                error_message,
            });
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EVENT", "RESULT ID", "TIME", "TEXT"])
                .add_row(event_cells(event));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{}", event_cells(event).join(" "));
        }
        OutputFormat::Raw => {
            if let Some(text) = event_text(event) {
                println!("{text}");
            }
        }
    }
}

fn event_cells(event: &SessionEvent) -> Vec<String> {
    let name = event_name(event).to_string();
    match event {
        SessionEvent::PartialResult(t) | SessionEvent::FinalResult(t) => match t.first_result() {
            Some(result) => vec![
                name,
                result.result_id.clone(),
                format!("{:.2}-{:.2}", result.start_time, result.end_time),
                result.best_transcript().unwrap_or_default().to_string(),
            ],
            None => vec![name, String::new(), String::new(), String::new()],
        },
        SessionEvent::Error(err) => vec![name, err.kind().to_string(), String::new(), err.to_string()],
        SessionEvent::Closed => vec![name, String::new(), String::new(), String::new()],
    }
}

/// Text of settled results only.
fn event_text(event: &SessionEvent) -> Option<&str> {
    match event {
        SessionEvent::FinalResult(t) => t.first_result().and_then(|r| r.best_transcript()),
        _ => None,
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
