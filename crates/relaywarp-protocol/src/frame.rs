//! Relay frames exchanged between endpoints sharing an allocation.
//!
//! Every frame names its sender by connection data so the receiving endpoint
//! can map it to a local connection handle.
//!
//! ```text
//! +----------+----------------------+----------------------------------+
//! | tag: u8  | sender: 16 bytes     | Data only: len: u16 (BE) + bytes |
//! +----------+----------------------+----------------------------------+
//! ```

use std::{
    convert::TryFrom,
    io::{self, Cursor, Read},
};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use relaywarp_core::{
    error::{DecodingErrorKind, ErrorKind},
    relay::ConnectionData,
};

/// Frame discriminant.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameTag {
    /// Peer asks the host for a connection.
    Connect = 1,
    /// Host accepted the connection.
    Accept = 2,
    /// One application datagram.
    Data = 3,
    /// Sender closed the link.
    Disconnect = 4,
}

impl TryFrom<u8> for FrameTag {
    type Error = ErrorKind;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(FrameTag::Connect),
            2 => Ok(FrameTag::Accept),
            3 => Ok(FrameTag::Data),
            4 => Ok(FrameTag::Disconnect),
            _ => Err(ErrorKind::Decoding(DecodingErrorKind::FrameTag)),
        }
    }
}

/// Frame body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    /// Connection request.
    Connect,
    /// Connection acceptance.
    Accept,
    /// Application payload.
    Data(Vec<u8>),
    /// Link closed.
    Disconnect,
}

impl FrameKind {
    fn tag(&self) -> FrameTag {
        match self {
            FrameKind::Connect => FrameTag::Connect,
            FrameKind::Accept => FrameTag::Accept,
            FrameKind::Data(_) => FrameTag::Data,
            FrameKind::Disconnect => FrameTag::Disconnect,
        }
    }
}

/// A frame together with the connection data of its sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayFrame {
    /// Who sent the frame.
    pub sender: ConnectionData,
    /// What was sent.
    pub kind: FrameKind,
}

impl RelayFrame {
    /// Creates a frame.
    pub fn new(sender: ConnectionData, kind: FrameKind) -> Self {
        Self { sender, kind }
    }

    /// Serializes the frame.
    pub fn encode(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(17);
        buffer.write_u8(self.kind.tag() as u8)?;
        buffer.extend_from_slice(&self.sender.0);
        if let FrameKind::Data(payload) = &self.kind {
            let len = u16::try_from(payload.len()).map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidInput, "frame payload exceeds u16 length")
            })?;
            buffer.write_u16::<BigEndian>(len)?;
            buffer.extend_from_slice(payload);
        }
        Ok(buffer)
    }

    /// Deserializes a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, ErrorKind> {
        let mut cursor = Cursor::new(bytes);
        let truncated = |_| ErrorKind::Decoding(DecodingErrorKind::Truncated);

        let tag = FrameTag::try_from(cursor.read_u8().map_err(truncated)?)?;
        let mut sender = [0u8; 16];
        cursor.read_exact(&mut sender).map_err(truncated)?;

        let kind = match tag {
            FrameTag::Connect => FrameKind::Connect,
            FrameTag::Accept => FrameKind::Accept,
            FrameTag::Disconnect => FrameKind::Disconnect,
            FrameTag::Data => {
                let len = cursor.read_u16::<BigEndian>().map_err(truncated)? as usize;
                let mut payload = vec![0u8; len];
                cursor.read_exact(&mut payload).map_err(truncated)?;
                FrameKind::Data(payload)
            }
        };
        Ok(RelayFrame { sender: ConnectionData(sender), kind })
    }
}
