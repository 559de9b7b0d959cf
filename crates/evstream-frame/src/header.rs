//! Typed key/value header block.
//!
//! Each entry is encoded as:
//! ```text
//! ┌──────────┬──────────┬──────────┬───────────┬───────────┐
//! │ name len │ name     │ type tag │ value len │ value     │
//! │ (1B)     │ (≤255B)  │ (1B = 7) │ (2B BE)   │ (≤65535B) │
//! └──────────┴──────────┴──────────┴───────────┴───────────┘
//! ```
//! Only the string type (tag 7) is supported in either direction.

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{HeaderDecodeError, HeaderEncodeError};

/// Type tag of a string-valued header.
pub const STRING_TYPE: u8 = 7;

const MAX_NAME_LEN: usize = u8::MAX as usize;
const MAX_VALUE_LEN: usize = u16::MAX as usize;
/// Name length, type tag and value length of an entry with empty name and value.
const MIN_ENTRY_LEN: usize = 4;

/// One header: a name, its declared type tag and its string value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderEntry {
    pub name: String,
    pub type_tag: u8,
    pub value: String,
}

impl HeaderEntry {
    /// A string-typed header.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_tag: STRING_TYPE,
            value: value.into(),
        }
    }

    fn validate(&self) -> Result<(), HeaderEncodeError> {
        if self.name.len() > MAX_NAME_LEN {
            return Err(HeaderEncodeError::NameTooLong {
                len: self.name.len(),
            });
        }
        if self.type_tag != STRING_TYPE {
            return Err(HeaderEncodeError::UnsupportedType(self.type_tag));
        }
        if self.value.len() > MAX_VALUE_LEN {
            return Err(HeaderEncodeError::ValueTooLong {
                name: self.name.clone(),
                len: self.value.len(),
            });
        }
        Ok(())
    }

    fn encoded_len(&self) -> usize {
        1 + self.name.len() + 1 + 2 + self.value.len()
    }
}

/// Ordered set of headers with unique names.
///
/// Iteration and encoding follow insertion order. Inserting an existing name
/// replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a string header, returning the previous value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.insert_entry(HeaderEntry::string(name, value))
            .map(|old| old.value)
    }

    /// Insert a fully specified entry, returning the one it replaced.
    pub fn insert_entry(&mut self, entry: HeaderEntry) -> Option<HeaderEntry> {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => Some(std::mem::replace(existing, entry)),
            None => {
                self.entries.push(entry);
                None
            }
        }
    }

    /// Value of the header called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HeaderEntry> {
        self.entries.iter()
    }

    /// Size of the encoded header block in bytes.
    pub fn encoded_len(&self) -> usize {
        self.entries.iter().map(HeaderEntry::encoded_len).sum()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = &'a HeaderEntry;
    type IntoIter = std::slice::Iter<'a, HeaderEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Append the encoded header block to `dst`.
///
/// Every entry is validated before anything is written, so `dst` is left
/// untouched on error.
pub fn encode_headers(headers: &Headers, dst: &mut BytesMut) -> Result<(), HeaderEncodeError> {
    for entry in headers {
        entry.validate()?;
    }

    dst.reserve(headers.encoded_len());
    for entry in headers {
        dst.put_u8(entry.name.len() as u8);
        dst.put_slice(entry.name.as_bytes());
        dst.put_u8(entry.type_tag);
        dst.put_u16(entry.value.len() as u16);
        dst.put_slice(entry.value.as_bytes());
    }
    Ok(())
}

/// Decode a complete header block.
///
/// The walk must consume `block` exactly; a repeated name keeps its last value.
pub fn decode_headers(block: &[u8]) -> Result<Headers, HeaderDecodeError> {
    let mut cursor = block;
    let mut headers = Headers::new();

    while cursor.has_remaining() {
        let offset = block.len() - cursor.remaining();

        // Too short for any entry after a complete one.
        if offset > 0 && cursor.remaining() < MIN_ENTRY_LEN {
            return Err(HeaderDecodeError::TrailingBytes {
                remaining: cursor.remaining(),
            });
        }

        let name_len = cursor.get_u8() as usize;
        if cursor.remaining() < name_len {
            return Err(HeaderDecodeError::TruncatedName { offset });
        }
        let name = take_utf8(&mut cursor, name_len, offset)?;

        if cursor.remaining() < 1 {
            return Err(HeaderDecodeError::TruncatedValue { offset });
        }
        let type_tag = cursor.get_u8();
        if type_tag != STRING_TYPE {
            return Err(HeaderDecodeError::UnsupportedType(type_tag));
        }

        if cursor.remaining() < 2 {
            return Err(HeaderDecodeError::TruncatedValue { offset });
        }
        let value_len = cursor.get_u16() as usize;
        if cursor.remaining() < value_len {
            return Err(HeaderDecodeError::TruncatedValue { offset });
        }
        let value = take_utf8(&mut cursor, value_len, offset)?;

        headers.insert_entry(HeaderEntry {
            name,
            type_tag,
            value,
        });
    }

    Ok(headers)
}

fn take_utf8<'a>(
    cursor: &mut &'a [u8],
    len: usize,
    offset: usize,
) -> Result<String, HeaderDecodeError> {
    let whole: &'a [u8] = *cursor;
    let (raw, rest) = whole.split_at(len);
    *cursor = rest;
    String::from_utf8(raw.to_vec()).map_err(|_| HeaderDecodeError::InvalidUtf8 { offset })
}
