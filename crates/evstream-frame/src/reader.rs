use std::io::{ErrorKind, Read};

use bytes::{Bytes, BytesMut};
use evstream_transport::IpcStream;
use tracing::trace;

use crate::codec::{decode_message, split_message, FrameConfig, Message};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete messages from any `Read` stream.
///
/// Handles partial reads internally. Callers always get whole messages.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the raw bytes of the next complete message (blocking).
    ///
    /// Only the prelude is verified here. Returns
    /// `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_unit(&mut self) -> Result<Bytes> {
        loop {
            if let Some(unit) = split_message(&mut self.buf, self.config.max_message_size)? {
                trace!(len = unit.len(), "read message unit");
                return Ok(unit);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Read and fully decode the next message (blocking).
    pub fn read_message(&mut self) -> Result<Message> {
        let unit = self.read_unit()?;
        decode_message(&unit)
    }

    /// Whether bytes of an incomplete message are buffered.
    pub fn has_partial(&self) -> bool {
        !self.buf.is_empty()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameReader<IpcStream> {
    /// Create a frame reader for `IpcStream` and apply read timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: evstream_transport::TransportError) -> FrameError {
    match err {
        evstream_transport::TransportError::Io(io)
        | evstream_transport::TransportError::Accept(io) => FrameError::Io(io),
        evstream_transport::TransportError::Bind { source, .. }
        | evstream_transport::TransportError::Connect { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
