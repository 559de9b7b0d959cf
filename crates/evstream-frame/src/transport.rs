use std::io::{ErrorKind, Read, Write};

use bytes::Bytes;
use evstream_transport::{IpcStream, Transport, TransportError, TransportEvent};
use tracing::{debug, warn};

use crate::codec::FrameConfig;
use crate::error::FrameError;
use crate::reader::{transport_to_frame_error, FrameReader};
use crate::writer::FrameWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Connecting,
    Open,
    Closing,
    /// The byte stream is unusable; `Closed` is reported next.
    Failed,
    Closed,
}

/// [`Transport`] over a byte stream, delimited into units by message length.
///
/// The stream is assumed to be connected already, so the first event is
/// `Open`. EOF becomes `Closed`. An I/O failure, EOF inside a message, or a
/// prelude that cannot be trusted becomes `Error` followed by `Closed`, since
/// the stream cannot be resynchronised. A read timeout becomes a non-fatal
/// `Error`. A failed write also ends the link.
pub struct FramedTransport<R, W> {
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    shutdown_handle: Option<IpcStream>,
    state: LinkState,
}

impl<R: Read, W: Write> FramedTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_config(reader, writer, FrameConfig::default())
    }

    pub fn with_config(reader: R, writer: W, config: FrameConfig) -> Self {
        Self {
            reader: FrameReader::with_config(reader, config.clone()),
            writer: FrameWriter::with_config(writer, config),
            shutdown_handle: None,
            state: LinkState::Connecting,
        }
    }

    fn fail(&mut self, err: FrameError) -> TransportEvent {
        warn!(error = %err, "framed transport failed");
        self.state = LinkState::Failed;
        TransportEvent::Error(err.to_string())
    }
}

impl FramedTransport<IpcStream, IpcStream> {
    /// Wrap a connected local stream, applying the configured timeouts.
    ///
    /// `close` shuts the socket down, so the remote side observes EOF.
    pub fn from_ipc(stream: IpcStream, config: FrameConfig) -> crate::error::Result<Self> {
        let read_half = stream.try_clone().map_err(transport_to_frame_error)?;
        let shutdown_handle = stream.try_clone().map_err(transport_to_frame_error)?;

        Ok(Self {
            reader: FrameReader::with_config_ipc(read_half, config.clone())?,
            writer: FrameWriter::with_config_ipc(stream, config)?,
            shutdown_handle: Some(shutdown_handle),
            state: LinkState::Connecting,
        })
    }
}

impl<R: Read, W: Write> Transport for FramedTransport<R, W> {
    fn send_unit(&mut self, unit: Bytes) -> Result<(), TransportError> {
        match self.state {
            LinkState::Connecting | LinkState::Open => {}
            _ => return Err(TransportError::Shutdown),
        }
        match self.writer.write_unit(&unit) {
            Ok(()) => Ok(()),
            Err(FrameError::MessageTooLarge { size, max }) => Err(TransportError::Io(
                std::io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("unit too large ({size} bytes, max {max})"),
                ),
            )),
            // Part of the unit may be on the wire, so the stream is out of step.
            Err(err) => {
                warn!(error = %err, "framed transport write failed");
                self.state = LinkState::Failed;
                Err(match err {
                    FrameError::Io(io) => TransportError::Io(io),
                    FrameError::ConnectionClosed => TransportError::Disconnected,
                    other => TransportError::Io(std::io::Error::other(other.to_string())),
                })
            }
        }
    }

    fn next_event(&mut self) -> Result<TransportEvent, TransportError> {
        match self.state {
            LinkState::Connecting => {
                self.state = LinkState::Open;
                return Ok(TransportEvent::Open);
            }
            LinkState::Failed | LinkState::Closed => {
                self.state = LinkState::Closed;
                return Ok(TransportEvent::Closed);
            }
            LinkState::Closing if self.shutdown_handle.is_none() => {
                self.state = LinkState::Closed;
                return Ok(TransportEvent::Closed);
            }
            LinkState::Open | LinkState::Closing => {}
        }

        match self.reader.read_unit() {
            Ok(unit) => Ok(TransportEvent::Unit(unit)),
            Err(FrameError::ConnectionClosed) if self.reader.has_partial() => {
                warn!("framed transport input ends inside a message");
                self.state = LinkState::Failed;
                Ok(TransportEvent::Error(
                    "input ends inside a message".to_string(),
                ))
            }
            Err(FrameError::ConnectionClosed) => {
                debug!("framed transport reached end of stream");
                self.state = LinkState::Closed;
                Ok(TransportEvent::Closed)
            }
            Err(FrameError::Io(err))
                if err.kind() == ErrorKind::WouldBlock || err.kind() == ErrorKind::TimedOut =>
            {
                Ok(TransportEvent::Error(format!("read timed out: {err}")))
            }
            Err(err) => Ok(self.fail(err)),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if !matches!(self.state, LinkState::Connecting | LinkState::Open) {
            return Ok(());
        }
        self.state = LinkState::Closing;
        debug!("framed transport close requested");

        // Best effort: the stream may already be broken.
        let _ = self.writer.flush();
        if let Some(handle) = &self.shutdown_handle {
            handle.shutdown()?;
        }
        Ok(())
    }
}
