use std::time::Duration;

use evstream_session::{SessionError, SessionEvent};
use tracing::info;

use crate::cmd::{check_chunk_size, read_input, StreamArgs};
use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub fn run(args: StreamArgs, format: OutputFormat) -> CliResult<i32> {
    let chunk_size = check_chunk_size(args.chunk_size)?;
    let timeout = args.timeout.as_deref().map(parse_duration).transpose()?;
    let audio = read_input(&args.input)?;

    #[cfg(not(unix))]
    {
        let _ = (chunk_size, timeout, audio, format);
        return Err(CliError::new(
            crate::exit::FAILURE,
            "stream requires Unix domain sockets",
        ));
    }

    #[cfg(unix)]
    {
        run_unix(&args, &audio, chunk_size, timeout, format)
    }
}

#[cfg(unix)]
fn run_unix(
    args: &StreamArgs,
    audio: &[u8],
    chunk_size: usize,
    timeout: Option<Duration>,
    format: OutputFormat,
) -> CliResult<i32> {
    use evstream_frame::{FrameConfig, FramedTransport};
    use evstream_session::{SessionConfig, StreamingSession};
    use evstream_transport::connect_unix;

    use crate::exit::{
        frame_error, session_error, transport_error, FAILURE, SUCCESS, TIMEOUT, TRANSPORT_ERROR,
    };
    use crate::output::print_event;

    let stream = connect_unix(&args.path).map_err(|err| transport_error("connect failed", err))?;
    let frame_config = FrameConfig {
        read_timeout: timeout,
        write_timeout: timeout,
        ..FrameConfig::default()
    };
    let transport = FramedTransport::from_ipc(stream, frame_config)
        .map_err(|err| frame_error("connect failed", err))?;

    let mut session = StreamingSession::with_config(
        transport,
        SessionConfig {
            max_chunk_size: chunk_size,
            ..SessionConfig::default()
        },
    );
    session
        .wait_ready()
        .map_err(|err| session_error("open failed", err))?;
    info!(path = %args.path.display(), "session open");

    // All audio goes out before results are read; the peer must keep
    // consuming audio while it produces results.
    let chunks = session
        .send_audio(audio)
        .map_err(|err| session_error("send failed", err))?;
    session
        .finish()
        .map_err(|err| session_error("send failed", err))?;
    info!(chunks, bytes = audio.len(), "audio sent");

    while let Some(event) = session
        .next_event()
        .map_err(|err| session_error("receive failed", err))?
    {
        print_event(&event, format);

        if let SessionEvent::Error(SessionError::TransportFailed(message)) = &event {
            let code = if message.contains("timed out") {
                TIMEOUT
            } else {
                TRANSPORT_ERROR
            };
            let _ = session.close();
            return Err(CliError::new(code, format!("receive failed: {message}")));
        }
    }

    let stats = session.stats();
    info!(
        sent = stats.frames_sent,
        received = stats.frames_received,
        rejected = stats.frames_rejected,
        "session closed"
    );

    if session.is_errored() {
        Ok(FAILURE)
    } else {
        Ok(SUCCESS)
    }
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let (number, millis) = match input.strip_suffix("ms") {
        Some(number) => (number, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input:?}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration(" 7 ").unwrap(), Duration::from_secs(7));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("0ms").is_err());
        assert_eq!(parse_duration("soon").unwrap_err().code, USAGE);
    }
}
