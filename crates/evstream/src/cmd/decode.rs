use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use evstream_frame::{decode_message, FrameError, FrameReader, FramedTransport};
use evstream_session::{SessionEvent, StreamingSession};
use tracing::{debug, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, session_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_event, print_messages, MessageRow, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let input = open_input(&args.path)?;
    if args.events {
        decode_events(input, format)
    } else {
        decode_messages(input, format)
    }
}

fn open_input(path: &Path) -> CliResult<Box<dyn Read>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path)
        .map_err(|err| io_error(&format!("open {} failed", path.display()), err))?;
    Ok(Box::new(BufReader::new(file)))
}

fn decode_messages(input: Box<dyn Read>, format: OutputFormat) -> CliResult<i32> {
    let mut reader = FrameReader::new(input);
    let mut rows = Vec::new();
    let mut payloads = Vec::new();
    let mut rejected = 0usize;

    let outcome = loop {
        let unit = match reader.read_unit() {
            Ok(unit) => unit,
            Err(FrameError::ConnectionClosed) if !reader.has_partial() => break Ok(()),
            Err(FrameError::ConnectionClosed) => {
                break Err(CliError::new(DATA_INVALID, "input ends inside a message"))
            }
            // The stream cannot be resynchronised past a bad prelude.
            Err(err) => break Err(frame_error("read failed", err)),
        };

        let index = rows.len();
        match decode_message(&unit) {
            Ok(message) => {
                debug!(index, size = unit.len(), "decoded message");
                rows.push(MessageRow::decoded(index, unit.len(), &message));
                payloads.push(message.payload.to_vec());
            }
            Err(err) => {
                warn!(index, kind = err.kind(), error = %err, "rejected message");
                rows.push(MessageRow::rejected(index, unit.len(), err.to_string()));
                rejected += 1;
            }
        }
    };

    print_messages(&rows, &payloads, format);
    outcome?;

    if rejected > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{rejected} of {} messages rejected", rows.len()),
        ));
    }
    Ok(SUCCESS)
}

fn decode_events(input: Box<dyn Read>, format: OutputFormat) -> CliResult<i32> {
    let transport = FramedTransport::new(input, io::sink());
    let mut session = StreamingSession::new(transport);
    session
        .wait_ready()
        .map_err(|err| session_error("open failed", err))?;

    while let Some(event) = session
        .next_event()
        .map_err(|err| session_error("read failed", err))?
    {
        if !matches!(event, SessionEvent::Closed) {
            print_event(&event, format);
        }
    }

    let stats = session.stats();
    debug!(
        received = stats.frames_received,
        rejected = stats.frames_rejected,
        "decoded events"
    );
    if session.is_errored() {
        return Err(CliError::new(
            DATA_INVALID,
            format!(
                "session reported errors ({} of {} messages rejected)",
                stats.frames_rejected, stats.frames_received
            ),
        ));
    }
    Ok(SUCCESS)
}
