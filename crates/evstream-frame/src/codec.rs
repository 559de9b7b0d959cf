use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::checksum::crc32;
use crate::error::{FrameError, Result};
use crate::header::{decode_headers, encode_headers, Headers};

/// Prelude: total length (4) + header length (4) + prelude CRC (4).
pub const PRELUDE_SIZE: usize = 12;

/// Trailing message CRC.
const TRAILER_SIZE: usize = 4;

/// Smallest valid message: prelude + trailer, no headers, no payload.
pub const MIN_MESSAGE_SIZE: usize = PRELUDE_SIZE + TRAILER_SIZE;

/// Default maximum message size when carving messages off a stream: 16 MiB.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// A decoded message: its headers and its opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub headers: Headers,
    pub payload: Bytes,
}

impl Message {
    pub fn new(headers: Headers, payload: impl Into<Bytes>) -> Self {
        Self {
            headers,
            payload: payload.into(),
        }
    }

    /// The total wire size of this message.
    pub fn wire_size(&self) -> usize {
        MIN_MESSAGE_SIZE + self.headers.encoded_len() + self.payload.len()
    }

    /// Encode into a standalone buffer, ready to send as one unit.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        encode_message(&self.headers, &self.payload, &mut buf)?;
        Ok(buf.freeze())
    }
}

/// The checksum-verified first 12 bytes of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Prelude {
    total_length: usize,
    header_length: usize,
}

impl Prelude {
    /// Parse and verify the prelude. `src` must hold at least `PRELUDE_SIZE` bytes.
    fn read(src: &[u8]) -> Result<Self> {
        let mut cursor = &src[..PRELUDE_SIZE];
        let total_length = cursor.get_u32() as usize;
        let header_length = cursor.get_u32() as usize;
        let expected = cursor.get_u32();

        let actual = crc32(&src[..8]);
        if actual != expected {
            return Err(FrameError::PreludeChecksumInvalid { expected, actual });
        }

        Ok(Self {
            total_length,
            header_length,
        })
    }

    /// Reject lengths that cannot describe a well-formed message.
    fn check_bounds(&self) -> Result<()> {
        if self.total_length < MIN_MESSAGE_SIZE {
            return Err(FrameError::FrameTooShort {
                len: self.total_length,
            });
        }
        if self.header_length > self.total_length - MIN_MESSAGE_SIZE {
            return Err(FrameError::LengthMismatch {
                declared: MIN_MESSAGE_SIZE + self.header_length,
                actual: self.total_length,
            });
        }
        Ok(())
    }

    fn payload_length(&self) -> usize {
        self.total_length - self.header_length - MIN_MESSAGE_SIZE
    }
}

/// Section boundaries of one complete, length-checked message.
struct Sections<'a> {
    header_block: &'a [u8],
    payload: &'a [u8],
    /// Headers and payload together, the range covered by the message CRC.
    checked: &'a [u8],
    stored_checksum: u32,
}

impl<'a> Sections<'a> {
    fn split(unit: &'a [u8], prelude: &Prelude) -> Self {
        let body_end = unit.len() - TRAILER_SIZE;
        let checked = &unit[PRELUDE_SIZE..body_end];
        let (header_block, payload) = checked.split_at(prelude.header_length);
        let mut trailer = &unit[body_end..];
        Self {
            header_block,
            payload,
            checked,
            stored_checksum: trailer.get_u32(),
        }
    }
}

/// Encode a message into the wire format, appending to `dst`.
///
/// Wire format (all integers big-endian):
/// ```text
/// ┌─────────────┬──────────────┬─────────────┬──────────────┬─────────┬─────────────┐
/// │ total len   │ header len   │ prelude CRC │ header block │ payload │ message CRC │
/// │ (4B)        │ (4B)         │ (4B)        │ (header len) │         │ (4B)        │
/// └─────────────┴──────────────┴─────────────┴──────────────┴─────────┴─────────────┘
/// ```
/// The prelude CRC covers the first 8 bytes; the message CRC covers the
/// header block and payload.
///
/// On error `dst` is left as it was.
pub fn encode_message(headers: &Headers, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    let mut header_bytes = BytesMut::with_capacity(headers.encoded_len());
    encode_headers(headers, &mut header_bytes)?;

    let total_length = MIN_MESSAGE_SIZE + header_bytes.len() + payload.len();
    if total_length > u32::MAX as usize {
        return Err(FrameError::MessageTooLarge {
            size: total_length,
            max: u32::MAX as usize,
        });
    }

    let start = dst.len();
    dst.reserve(total_length);
    dst.put_u32(total_length as u32);
    dst.put_u32(header_bytes.len() as u32);
    let prelude_checksum = crc32(&dst[start..start + 8]);
    dst.put_u32(prelude_checksum);

    dst.put_slice(&header_bytes);
    dst.put_slice(payload);
    let message_checksum = crc32(&dst[start + PRELUDE_SIZE..]);
    dst.put_u32(message_checksum);

    Ok(())
}

/// Decode exactly one message from `unit`.
///
/// Validation order: minimum size, prelude CRC, declared lengths against the
/// received length, message CRC, then the header block. Nothing is returned
/// unless every check passes.
pub fn decode_message(unit: &[u8]) -> Result<Message> {
    if unit.len() < MIN_MESSAGE_SIZE {
        return Err(FrameError::FrameTooShort { len: unit.len() });
    }

    let prelude = Prelude::read(unit)?;
    if prelude.total_length != unit.len() {
        return Err(FrameError::LengthMismatch {
            declared: prelude.total_length,
            actual: unit.len(),
        });
    }
    prelude.check_bounds()?;

    let sections = Sections::split(unit, &prelude);
    debug_assert_eq!(sections.payload.len(), prelude.payload_length());

    let actual = crc32(sections.checked);
    if actual != sections.stored_checksum {
        return Err(FrameError::MessageChecksumInvalid {
            expected: sections.stored_checksum,
            actual,
        });
    }

    let headers = decode_headers(sections.header_block)?;
    Ok(Message {
        headers,
        payload: Bytes::copy_from_slice(sections.payload),
    })
}

/// Carve one complete message off the front of a byte stream.
///
/// Returns `Ok(None)` if the buffer doesn't hold a complete message yet. The
/// prelude CRC is verified before `total_length` is trusted. On success the
/// message bytes are removed from `src`; they still need [`decode_message`].
pub fn split_message(src: &mut BytesMut, max_message_size: usize) -> Result<Option<Bytes>> {
    if src.len() < PRELUDE_SIZE {
        return Ok(None); // Need more data
    }

    let prelude = Prelude::read(src)?;
    prelude.check_bounds()?;
    if prelude.total_length > max_message_size {
        return Err(FrameError::MessageTooLarge {
            size: prelude.total_length,
            max: max_message_size,
        });
    }

    if src.len() < prelude.total_length {
        src.reserve(prelude.total_length - src.len());
        return Ok(None); // Need more data
    }

    Ok(Some(src.split_to(prelude.total_length).freeze()))
}

/// Configuration for stream delimitation.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum message size in bytes. Default: 16 MiB.
    pub max_message_size: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
