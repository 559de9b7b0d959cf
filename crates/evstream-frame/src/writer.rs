use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use evstream_transport::IpcStream;
use tracing::trace;

use crate::codec::{encode_message, FrameConfig, Message, MIN_MESSAGE_SIZE};
use crate::error::{FrameError, Result};
use crate::header::Headers;
use crate::reader::transport_to_frame_error;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete messages to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Write a complete message (blocking).
    pub fn write_message(&mut self, message: &Message) -> Result<()> {
        self.send(&message.headers, message.payload.as_ref())
    }

    /// Encode and send headers and payload as one message.
    pub fn send(&mut self, headers: &Headers, payload: &[u8]) -> Result<()> {
        let size = MIN_MESSAGE_SIZE + headers.encoded_len() + payload.len();
        if size > self.config.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size,
                max: self.config.max_message_size,
            });
        }

        self.buf.clear();
        encode_message(headers, payload, &mut self.buf)?;
        self.write_buffered()
    }

    /// Write an already-encoded message unit verbatim.
    pub fn write_unit(&mut self, unit: &[u8]) -> Result<()> {
        if unit.len() > self.config.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size: unit.len(),
                max: self.config.max_message_size,
            });
        }

        self.buf.clear();
        self.buf.extend_from_slice(unit);
        self.write_buffered()
    }

    fn write_buffered(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if self.should_retry(&err) => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
        trace!(len = offset, "wrote message unit");

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if self.should_retry(&err) => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// With a write timeout, `WouldBlock` means the timeout expired.
    fn should_retry(&self, err: &std::io::Error) -> bool {
        err.kind() == ErrorKind::WouldBlock && self.config.write_timeout.is_none()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl FrameWriter<IpcStream> {
    /// Create a frame writer for `IpcStream` and apply write timeout from config.
    pub fn with_config_ipc(inner: IpcStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use bytes::{Bytes, BytesMut};

    use super::*;
    use crate::codec::{decode_message, split_message};

    fn headers() -> Headers {
        [("event-type", "AudioEvent")].into_iter().collect()
    }

    fn written(writer: FrameWriter<Cursor<Vec<u8>>>) -> BytesMut {
        BytesMut::from(writer.into_inner().into_inner().as_slice())
    }

    fn next(wire: &mut BytesMut) -> Message {
        let unit = split_message(wire, usize::MAX).unwrap().unwrap();
        decode_message(&unit).unwrap()
    }

    #[test]
    fn write_single_message() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&headers(), b"hello").unwrap();

        let mut wire = written(writer);
        let message = next(&mut wire);
        assert_eq!(message.headers, headers());
        assert_eq!(message.payload.as_ref(), b"hello");
        assert!(wire.is_empty());
    }

    #[test]
    fn write_multiple_messages() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&headers(), b"one").unwrap();
        writer.send(&headers(), b"two").unwrap();

        let mut wire = written(writer);
        assert_eq!(next(&mut wire).payload.as_ref(), b"one");
        assert_eq!(next(&mut wire).payload.as_ref(), b"two");
    }

    #[test]
    fn write_message_method() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let message = Message::new(headers(), Bytes::from_static(b"abc"));
        writer.write_message(&message).unwrap();

        let mut wire = written(writer);
        assert_eq!(next(&mut wire), message);
    }

    #[test]
    fn write_unit_is_verbatim() {
        let unit = Message::new(headers(), Bytes::from_static(b"pre-encoded"))
            .encode()
            .unwrap();
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_unit(&unit).unwrap();

        assert_eq!(written(writer).as_ref(), unit.as_ref());
    }

    #[test]
    fn message_too_large_rejected() {
        let cfg = FrameConfig {
            max_message_size: 32,
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), cfg);

        let err = writer.send(&headers(), b"oversized payload").unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLarge { max: 32, .. }));
        let err = writer.write_unit(&[0u8; 33]).unwrap_err();
        assert!(matches!(err, FrameError::MessageTooLarge { size: 33, .. }));
        assert!(written(writer).is_empty());
    }

    #[test]
    fn flush_propagates() {
        let sink = FlushTrackingWriter::default();
        let flag = Arc::clone(&sink.flushed);
        let mut writer = FrameWriter::new(sink);

        writer.send(&headers(), b"x").unwrap();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn handles_interrupted_and_would_block() {
        let sink = FlakyWriter {
            failures: vec![ErrorKind::Interrupted, ErrorKind::WouldBlock],
            data: Vec::new(),
        };
        let mut writer = FrameWriter::new(sink);
        writer.send(&headers(), b"retry").unwrap();

        let mut wire = BytesMut::from(writer.into_inner().data.as_slice());
        assert_eq!(next(&mut wire).payload.as_ref(), b"retry");
    }

    #[test]
    fn would_block_is_a_timeout_when_one_is_configured() {
        let sink = FlakyWriter {
            failures: vec![ErrorKind::WouldBlock],
            data: Vec::new(),
        };
        let cfg = FrameConfig {
            write_timeout: Some(std::time::Duration::from_millis(10)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config(sink, cfg);

        let err = writer.send(&headers(), b"stalled").unwrap_err();
        assert!(matches!(err, FrameError::Io(ref io) if io.kind() == ErrorKind::WouldBlock));
    }

    #[test]
    #[cfg(unix)]
    fn write_timeout_bounds_a_peer_that_never_reads() {
        use std::sync::mpsc;
        use std::thread;
        use std::time::Duration;

        let (left, right) = IpcStream::pair().unwrap();
        let cfg = FrameConfig {
            write_timeout: Some(Duration::from_millis(100)),
            ..FrameConfig::default()
        };
        let mut writer = FrameWriter::with_config_ipc(left, cfg).unwrap();

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = writer.write_unit(&vec![0u8; 4 * 1024 * 1024]);
            let _ = tx.send(result);
        });

        let result = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("write should give up once the timeout expires");
        let err = result.unwrap_err();
        assert!(matches!(
            err,
            FrameError::Io(ref io)
                if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
        ));
        drop(right);
    }

    #[test]
    fn connection_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(&headers(), b"x").unwrap_err();
        assert!(matches!(err, FrameError::ConnectionClosed));
    }

    #[derive(Default)]
    struct FlushTrackingWriter {
        flushed: Arc<AtomicBool>,
    }

    impl Write for FlushTrackingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FlakyWriter {
        failures: Vec<ErrorKind>,
        data: Vec<u8>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Some(kind) = self.failures.pop() {
                return Err(std::io::Error::from(kind));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
