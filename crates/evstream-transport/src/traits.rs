use std::io::{Read, Write};
use std::net::Shutdown;

use bytes::Bytes;

use crate::error::Result;

/// A lifecycle notification or inbound unit delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is established and units may flow.
    Open,
    /// One inbound unit, already delimited by the transport.
    Unit(Bytes),
    /// The transport hit an error. It may or may not be followed by `Closed`.
    Error(String),
    /// The connection is gone. No further units will arrive.
    Closed,
}

/// Byte-unit transport consumed by a streaming session.
///
/// Implementations preserve delivery order: units are yielded from
/// [`next_event`](Transport::next_event) in the order the remote side sent them.
pub trait Transport {
    /// Send one opaque buffer as a single outbound unit.
    fn send_unit(&mut self, unit: Bytes) -> Result<()>;

    /// Block until the next lifecycle notification or inbound unit.
    ///
    /// Once `Closed` has been returned, later calls keep returning `Closed`.
    fn next_event(&mut self) -> Result<TransportEvent>;

    /// Request shutdown. Closure is confirmed by a later `Closed` event.
    fn close(&mut self) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_unit(&mut self, unit: Bytes) -> Result<()> {
        (**self).send_unit(unit)
    }

    fn next_event(&mut self) -> Result<TransportEvent> {
        (**self).next_event()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// A connected local byte stream (Read + Write).
///
/// Units are not delimited at this level; the frame layer carves them out of
/// the byte stream using the length prefix of each message.
pub struct IpcStream {
    inner: IpcStreamInner,
}

enum IpcStreamInner {
    #[cfg(unix)]
    Unix(std::os::unix::net::UnixStream),
}

impl Read for IpcStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for IpcStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.flush(),
        }
    }
}

impl IpcStream {
    /// Wrap a connected Unix domain socket stream.
    #[cfg(unix)]
    pub fn from_unix(stream: std::os::unix::net::UnixStream) -> Self {
        Self {
            inner: IpcStreamInner::Unix(stream),
        }
    }

    /// Connected pair of streams, mostly useful for tests and in-process peers.
    #[cfg(unix)]
    pub fn pair() -> Result<(Self, Self)> {
        let (left, right) = std::os::unix::net::UnixStream::pair()?;
        Ok((Self::from_unix(left), Self::from_unix(right)))
    }

    /// Set read timeout on the underlying stream.
    pub fn set_read_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_read_timeout(timeout).map_err(Into::into),
        }
    }

    /// Set write timeout on the underlying stream.
    pub fn set_write_timeout(&self, timeout: Option<std::time::Duration>) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => stream.set_write_timeout(timeout).map_err(Into::into),
        }
    }

    /// Try to clone this stream (creates a new file descriptor).
    pub fn try_clone(&self) -> Result<Self> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => Ok(Self::from_unix(stream.try_clone()?)),
        }
    }

    /// Shut down both directions. Blocked readers on any clone observe EOF.
    pub fn shutdown(&self) -> Result<()> {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(stream) => match stream.shutdown(Shutdown::Both) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => Ok(()),
                Err(err) => Err(err.into()),
            },
        }
    }
}

impl std::fmt::Debug for IpcStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            #[cfg(unix)]
            IpcStreamInner::Unix(_) => f.debug_struct("IpcStream").field("type", &"unix").finish(),
        }
    }
}
