//! Binary frame and opcode types.
//!
//! # Wire Format
//!
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────┐
//! │ opcode (i32) │ length (i32) │ payload (length B)  │
//! │ little-end.  │ little-end.  │                     │
//! └──────────────┴──────────────┴─────────────────────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Size of the frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest payload accepted from the peer.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

// ============================================================================
// Opcode
// ============================================================================

/// Purpose of a frame. The set is closed: anything else is a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Opcode {
    /// First frame of every session, sent by the client.
    Handshake = 0,
    /// JSON envelope.
    Message = 1,
    /// Peer-initiated close carrying an error body.
    Close = 2,
    /// Keepalive request, payload echoed back as [`Opcode::Pong`].
    Ping = 3,
    /// Keepalive response.
    Pong = 4,
}

impl Opcode {
    /// Returns the wire value.
    #[inline]
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Opcode {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Self::Handshake),
            1 => Ok(Self::Message),
            2 => Ok(Self::Close),
            3 => Ok(Self::Ping),
            4 => Ok(Self::Pong),
            other => Err(Error::protocol_violation(format!(
                "unexpected opcode {other}"
            ))),
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Handshake => "HANDSHAKE",
            Self::Message => "MESSAGE",
            Self::Close => "CLOSE",
            Self::Ping => "PING",
            Self::Pong => "PONG",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Frame
// ============================================================================

/// One `(opcode, payload)` unit on the wire.
///
/// The opcode is kept raw so that the session, not the codec, decides what
/// an unknown value means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Raw opcode as read from or written to the wire.
    pub opcode: i32,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a frame for a known opcode.
    #[inline]
    #[must_use]
    pub fn new(opcode: Opcode, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            opcode: opcode.as_i32(),
            payload: payload.into(),
        }
    }

    /// Creates a frame whose payload is `value` encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    pub fn json<T: Serialize>(opcode: Opcode, value: &T) -> Result<Self> {
        Ok(Self::new(opcode, serde_json::to_vec(value)?))
    }

    /// Returns the typed opcode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] for values outside the set.
    #[inline]
    pub fn kind(&self) -> Result<Opcode> {
        Opcode::try_from(self.opcode)
    }

    /// Returns the payload as UTF-8 text, replacing invalid sequences.
    #[must_use]
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Encodes the frame into its wire representation.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len());
        buf.extend_from_slice(&self.opcode.to_le_bytes());
        buf.extend_from_slice(&(self.payload.len() as i32).to_le_bytes());
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Decodes one frame from the front of `bytes`.
    ///
    /// Returns the frame and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// - [`Error::ChannelClosed`] if `bytes` holds less than a full frame
    /// - [`Error::ProtocolViolation`] if the length field is out of range
    pub fn decode(bytes: &[u8]) -> Result<(Self, usize)> {
        let header: &[u8; HEADER_LEN] = bytes
            .get(..HEADER_LEN)
            .and_then(|h| h.try_into().ok())
            .ok_or(Error::ChannelClosed)?;
        let (opcode, len) = parse_header(header)?;

        let end = HEADER_LEN + len;
        let payload = bytes.get(HEADER_LEN..end).ok_or(Error::ChannelClosed)?;

        Ok((
            Self {
                opcode,
                payload: payload.to_vec(),
            },
            end,
        ))
    }
}

/// Splits a header into opcode and validated payload length.
pub(crate) fn parse_header(header: &[u8; HEADER_LEN]) -> Result<(i32, usize)> {
    let opcode = i32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    let len = i32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    let len = usize::try_from(len)
        .map_err(|_| Error::protocol_violation(format!("negative payload length {len}")))?;
    if len > MAX_PAYLOAD_LEN {
        return Err(Error::protocol_violation(format!(
            "payload length {len} exceeds {MAX_PAYLOAD_LEN}"
        )));
    }

    Ok((opcode, len))
}

// ============================================================================
// Tests
// ============================================================================
