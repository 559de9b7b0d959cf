use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{decode_message, encode_message, split_message, Message, DEFAULT_MAX_MESSAGE_SIZE};
use crate::error::{FrameError, Result};

/// `tokio_util` codec for event-stream messages.
///
/// Each decoded item is fully validated (both checksums and the header block).
#[derive(Debug, Clone)]
pub struct EventStreamCodec {
    max_message_size: usize,
}

impl EventStreamCodec {
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for EventStreamCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EventStreamCodec {
    type Item = Message;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>> {
        match split_message(src, self.max_message_size)? {
            Some(unit) => decode_message(&unit).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<Message> for EventStreamCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Message, dst: &mut BytesMut) -> Result<()> {
        let size = item.wire_size();
        if size > self.max_message_size {
            return Err(FrameError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }
        encode_message(&item.headers, &item.payload, dst)
    }
}
