//! CRC32-protected, length-prefixed event-stream message framing.
//!
//! Every message on the wire is laid out as:
//! - a 12-byte prelude: total length, header block length (both u32 BE) and
//!   a CRC32 of those 8 bytes
//! - a block of typed key/value headers
//! - an opaque payload
//! - a trailing CRC32 over the headers and payload
//!
//! Decoding validates every length and checksum before handing anything back.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod codec;
pub mod error;
pub mod header;
pub mod reader;
pub mod transport;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::EventStreamCodec;
pub use checksum::{crc32, Crc32};
pub use codec::{
    decode_message, encode_message, split_message, FrameConfig, Message, DEFAULT_MAX_MESSAGE_SIZE,
    MIN_MESSAGE_SIZE, PRELUDE_SIZE,
};
pub use error::{FrameError, HeaderDecodeError, HeaderEncodeError, Result};
pub use header::{decode_headers, encode_headers, HeaderEntry, Headers, STRING_TYPE};
pub use reader::FrameReader;
pub use transport::FramedTransport;
pub use writer::FrameWriter;
