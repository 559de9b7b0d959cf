use std::fs::File;
use std::io::{BufWriter, Write};

use evstream_frame::{FrameWriter, MIN_MESSAGE_SIZE};
use evstream_session::audio_event_headers;
use serde::Serialize;
use tracing::info;

use crate::cmd::{check_chunk_size, read_input, EncodeArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

/// Payload of the message that tells the peer no more audio follows.
const END_OF_STREAM: &[u8] = &[];

#[derive(Serialize)]
struct EncodeSummary {
    input: String,
    output: String,
    messages: usize,
    audio_bytes: usize,
    wire_bytes: usize,
    end_stream: bool,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let chunk_size = check_chunk_size(args.chunk_size)?;
    let audio = read_input(&args.input)?;

    let (messages, wire_bytes) = match &args.output {
        Some(path) => {
            let file = File::create(path)
                .map_err(|err| io_error(&format!("create {} failed", path.display()), err))?;
            write_frames(BufWriter::new(file), &audio, chunk_size, !args.no_end_stream)?
        }
        None => write_frames(std::io::stdout().lock(), &audio, chunk_size, !args.no_end_stream)?,
    };

    info!(messages, audio_bytes = audio.len(), wire_bytes, "encoded audio");

    // Frames went to stdout; nothing else may be printed there.
    let Some(output) = &args.output else {
        return Ok(SUCCESS);
    };

    let summary = EncodeSummary {
        input: args.input.display().to_string(),
        output: output.display().to_string(),
        messages,
        audio_bytes: audio.len(),
        wire_bytes,
        end_stream: !args.no_end_stream,
    };
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(&summary).unwrap_or_else(|_| "{}".to_string())
        ),
        _ => println!(
            "wrote {} messages ({} audio bytes, {} wire bytes) to {}",
            summary.messages, summary.audio_bytes, summary.wire_bytes, summary.output
        ),
    }
    Ok(SUCCESS)
}

/// Returns the number of messages and encoded bytes written.
fn write_frames<W: Write>(
    sink: W,
    audio: &[u8],
    chunk_size: usize,
    end_stream: bool,
) -> CliResult<(usize, usize)> {
    let headers = audio_event_headers();
    let overhead = MIN_MESSAGE_SIZE + headers.encoded_len();
    let mut writer = FrameWriter::new(sink);
    let mut messages = 0usize;
    let mut wire_bytes = 0usize;

    let end = end_stream.then_some(END_OF_STREAM);
    for chunk in audio.chunks(chunk_size).chain(end) {
        writer
            .send(&headers, chunk)
            .map_err(|err| frame_error("write failed", err))?;
        messages += 1;
        wire_bytes += overhead + chunk.len();
    }

    Ok((messages, wire_bytes))
}
