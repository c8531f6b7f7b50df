//! Frame parsing and serialization (RFC 6455 Section 5.2).

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask;

/// Maximum payload size for control frames.
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Decoded fixed part of a frame, available before the payload arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    /// RSV1-3 as the three high bits below FIN (0b0111_0000 mask).
    pub rsv: u8,
    pub opcode: OpCode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: usize,
    /// Bytes occupied by the header including extended length and mask key.
    pub header_len: usize,
}

impl FrameHeader {
    /// Parse the header at the start of `buf`.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if `buf` does not hold the whole header yet
    /// - `Error::ReservedOpcode` for reserved opcodes
    /// - `Error::FrameTooLarge` if a 64-bit length does not fit in `usize`
    pub fn parse(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::IncompleteFrame {
                needed: 2 - buf.len(),
            });
        }

        let fin = buf[0] & 0x80 != 0;
        let rsv = buf[0] & 0x70;
        let opcode = OpCode::from_u8(buf[0])?;
        let masked = buf[1] & 0x80 != 0;

        let (payload_len, len_end) = match buf[1] & 0x7F {
            126 => {
                let bytes = need(buf, 4)?;
                (u16::from_be_bytes([bytes[2], bytes[3]]) as usize, 4)
            }
            127 => {
                let bytes = need(buf, 10)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&bytes[2..10]);
                let len = u64::from_be_bytes(raw);
                let len = usize::try_from(len).map_err(|_| Error::FrameTooLarge {
                    size: usize::MAX,
                    max: usize::MAX,
                })?;
                (len, 10)
            }
            short => (short as usize, 2),
        };

        let (mask, header_len) = if masked {
            let bytes = need(buf, len_end + 4)?;
            let mut key = [0u8; 4];
            key.copy_from_slice(&bytes[len_end..len_end + 4]);
            (Some(key), len_end + 4)
        } else {
            (None, len_end)
        };

        Ok(Self {
            fin,
            rsv,
            opcode,
            mask,
            payload_len,
            header_len,
        })
    }
}

fn need(buf: &[u8], len: usize) -> Result<&[u8]> {
    if buf.len() < len {
        Err(Error::IncompleteFrame {
            needed: len - buf.len(),
        })
    } else {
        Ok(buf)
    }
}

/// A single WebSocket frame with an unmasked payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag.
    pub fin: bool,
    /// Reserved bits as they appeared on the wire.
    pub rsv: u8,
    pub opcode: OpCode,
    payload: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: Vec<u8>) -> Self {
        Self {
            fin,
            rsv: 0,
            opcode,
            payload,
        }
    }

    #[must_use]
    pub fn text(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Text, data.into())
    }

    #[must_use]
    pub fn binary(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Binary, data.into())
    }

    /// Create a close frame with optional status code and reason.
    #[must_use]
    pub fn close(code: Option<u16>, reason: &str) -> Self {
        let payload = match code {
            Some(code) => {
                let mut data = code.to_be_bytes().to_vec();
                data.extend_from_slice(reason.as_bytes());
                data
            }
            None => Vec::new(),
        };
        Self::new(true, OpCode::Close, payload)
    }

    #[must_use]
    pub fn ping(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Ping, data.into())
    }

    #[must_use]
    pub fn pong(data: impl Into<Vec<u8>>) -> Self {
        Self::new(true, OpCode::Pong, data.into())
    }

    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }

    /// Status code carried by a close frame, if any.
    #[must_use]
    pub fn close_code(&self) -> Option<u16> {
        match (self.opcode, self.payload.as_slice()) {
            (OpCode::Close, [hi, lo, ..]) => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    /// Parse a frame from a buffer, unmasking the payload if needed.
    ///
    /// Returns the frame and the number of bytes consumed.
    ///
    /// ## Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::ReservedOpcode` if a reserved opcode is used
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let header = FrameHeader::parse(buf)?;
        let total = header
            .header_len
            .checked_add(header.payload_len)
            .ok_or(Error::FrameTooLarge {
                size: header.payload_len,
                max: usize::MAX - header.header_len,
            })?;
        let bytes = need(buf, total)?;

        let mut payload = bytes[header.header_len..total].to_vec();
        if let Some(mask) = header.mask {
            apply_mask(&mut payload, mask);
        }

        let frame = Frame {
            fin: header.fin,
            rsv: header.rsv,
            opcode: header.opcode,
            payload,
        };
        Ok((frame, total))
    }

    /// Check RFC 6455 structural rules that do not depend on the role.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if RSV bits are set (no extensions are negotiated)
    /// - `Error::FragmentedControlFrame` if a control frame has FIN=0
    /// - `Error::ControlFrameTooLarge` if a control frame payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv != 0 {
            return Err(Error::ReservedBitsSet);
        }
        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }
        Ok(())
    }

    /// Number of bytes [`Frame::write`] will produce.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        let len = self.payload.len();
        let extended = match len {
            0..=125 => 0,
            126..=65535 => 2,
            _ => 8,
        };
        let mask_len = if masked { 4 } else { 0 };
        2 + extended + mask_len + len
    }

    /// Append the serialized frame to `buf`, masking the payload when a key
    /// is given (required for client frames).
    pub fn write(&self, buf: &mut Vec<u8>, mask: Option<[u8; 4]>) {
        let len = self.payload.len();
        buf.reserve(self.wire_size(mask.is_some()));

        let mut byte0 = self.opcode.as_u8() | (self.rsv & 0x70);
        if self.fin {
            byte0 |= 0x80;
        }
        buf.push(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        match len {
            0..=125 => buf.push(mask_bit | len as u8),
            126..=65535 => {
                buf.push(mask_bit | 126);
                buf.extend_from_slice(&(len as u16).to_be_bytes());
            }
            _ => {
                buf.push(mask_bit | 127);
                buf.extend_from_slice(&(len as u64).to_be_bytes());
            }
        }

        if let Some(key) = mask {
            buf.extend_from_slice(&key);
        }
        let start = buf.len();
        buf.extend_from_slice(&self.payload);
        if let Some(key) = mask {
            apply_mask(&mut buf[start..], key);
        }
    }
}
