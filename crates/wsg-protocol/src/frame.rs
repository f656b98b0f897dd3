//! Frame model
//!
//! Wire layout (RFC 6455, section 5.2):
//! - byte 0: FIN (1 bit), RSV1-3 (3 bits), opcode (4 bits)
//! - byte 1: MASK (1 bit), payload length (7 bits)
//! - 0, 2 or 8 bytes of extended payload length (big-endian)
//! - 4 byte masking key when MASK is set
//! - payload

use bytes::Bytes;

use crate::close_code::CloseCode;

/// Largest payload a control frame may carry
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Default upper bound for a single frame payload (16MB)
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Frame opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Continuation of a fragmented message
    Continuation = 0x0,
    /// UTF-8 text
    Text = 0x1,
    /// Binary data
    Binary = 0x2,
    /// Connection close
    Close = 0x8,
    /// Ping
    Ping = 0x9,
    /// Pong
    Pong = 0xA,
}

impl OpCode {
    /// Convert to u8
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Convert from u8, `None` for reserved opcodes
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x0 => Some(Self::Continuation),
            0x1 => Some(Self::Text),
            0x2 => Some(Self::Binary),
            0x8 => Some(Self::Close),
            0x9 => Some(Self::Ping),
            0xA => Some(Self::Pong),
            _ => None,
        }
    }

    /// Close, Ping and Pong
    pub fn is_control(&self) -> bool {
        self.as_u8() & 0x8 != 0
    }

    /// Text and Binary (continuations excluded)
    pub fn is_data(&self) -> bool {
        matches!(self, Self::Text | Self::Binary)
    }
}

/// A single WebSocket frame.
///
/// `payload` is always held unmasked; when `mask` is set the encoder applies
/// it on the way out and the decoder has already removed it on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag
    pub fin: bool,
    /// Frame opcode
    pub opcode: OpCode,
    /// Masking key, if the frame is (to be) masked
    pub mask: Option<[u8; 4]>,
    /// Unmasked payload
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame
    pub fn new(fin: bool, opcode: OpCode, mask: Option<[u8; 4]>, payload: Bytes) -> Self {
        Self {
            fin,
            opcode,
            mask,
            payload,
        }
    }

    /// Final Close frame whose payload is just the big-endian status code
    pub fn close(code: CloseCode, mask: Option<[u8; 4]>) -> Self {
        Self::new(
            true,
            OpCode::Close,
            mask,
            Bytes::copy_from_slice(&code.to_be_bytes()),
        )
    }

    /// Raw status code of a Close frame, if it carries one
    pub fn close_code(&self) -> Option<u16> {
        if self.opcode != OpCode::Close || self.payload.len() < 2 {
            return None;
        }
        Some(u16::from_be_bytes([self.payload[0], self.payload[1]]))
    }

    /// Whether the frame carries a masking key
    pub fn is_masked(&self) -> bool {
        self.mask.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_roundtrip() {
        for opcode in [
            OpCode::Continuation,
            OpCode::Text,
            OpCode::Binary,
            OpCode::Close,
            OpCode::Ping,
            OpCode::Pong,
        ] {
            assert_eq!(OpCode::from_u8(opcode.as_u8()), Some(opcode));
        }
    }

    #[test]
    fn test_reserved_opcodes() {
        for byte in [0x3, 0x4, 0x5, 0x6, 0x7, 0xB, 0xC, 0xD, 0xE, 0xF] {
            assert!(OpCode::from_u8(byte).is_none());
        }
    }

    #[test]
    fn test_control_classification() {
        assert!(OpCode::Close.is_control());
        assert!(OpCode::Ping.is_control());
        assert!(!OpCode::Text.is_control());
        assert!(!OpCode::Continuation.is_data());
        assert!(OpCode::Binary.is_data());
    }

    #[test]
    fn test_close_frame() {
        let frame = Frame::close(CloseCode::ProtocolError, None);
        assert!(frame.fin);
        assert_eq!(frame.opcode, OpCode::Close);
        assert!(!frame.is_masked());
        assert_eq!(frame.payload.as_ref(), &[0x03, 0xEA]);
        assert_eq!(frame.close_code(), Some(1002));
    }
}
