//! Fixed-capacity text records carried one per data event.
//!
//! Layout on the wire:
//!
//! ```text
//! +-----------------+---------------------------+
//! | len: u16 (LE)   | len bytes of UTF-8 text   |
//! +-----------------+---------------------------+
//! ```
//!
//! `len` never exceeds [`TEXT_RECORD_CAPACITY`]. A record never spans two
//! events and a decoder reads exactly one record per payload.

use std::{
    fmt,
    io::{Cursor, Read},
};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use relaywarp_core::{
    constants::TEXT_RECORD_CAPACITY,
    error::{DecodingErrorKind, ErrorKind, Result},
};

/// Short UTF-8 string bounded by [`TEXT_RECORD_CAPACITY`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TextRecord(String);

impl TextRecord {
    /// Creates a record, rejecting text longer than the record capacity.
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if text.len() > TEXT_RECORD_CAPACITY {
            return Err(ErrorKind::PayloadTooLarge { size: text.len(), max: TEXT_RECORD_CAPACITY });
        }
        Ok(TextRecord(text))
    }

    /// Creates a record, cutting the text at the last char boundary that fits.
    pub fn truncated(text: &str) -> Self {
        let mut end = text.len().min(TEXT_RECORD_CAPACITY);
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        TextRecord(text[..end].to_string())
    }

    /// Returns the text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of encoded bytes, length prefix included.
    pub fn encoded_len(&self) -> usize {
        2 + self.0.len()
    }

    /// Serializes the record.
    pub fn encode(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(self.encoded_len());
        // Writes into a Vec cannot fail.
        let _ = buffer.write_u16::<LittleEndian>(self.0.len() as u16);
        buffer.extend_from_slice(self.0.as_bytes());
        buffer
    }

    /// Reads one record from the front of `payload`. Trailing bytes are ignored.
    pub fn decode(payload: &[u8]) -> std::result::Result<Self, DecodingErrorKind> {
        let mut cursor = Cursor::new(payload);
        let len =
            cursor.read_u16::<LittleEndian>().map_err(|_| DecodingErrorKind::Truncated)? as usize;
        if len > TEXT_RECORD_CAPACITY {
            return Err(DecodingErrorKind::LengthOverflow);
        }
        let mut content = vec![0u8; len];
        cursor.read_exact(&mut content).map_err(|_| DecodingErrorKind::Truncated)?;
        String::from_utf8(content).map(TextRecord).map_err(|_| DecodingErrorKind::InvalidUtf8)
    }
}

impl fmt::Display for TextRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for TextRecord {
    type Error = ErrorKind;

    fn try_from(value: &str) -> Result<Self> {
        TextRecord::new(value)
    }
}
