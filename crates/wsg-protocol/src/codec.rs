//! Tokio codec for WebSocket frames

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::close_code::CloseCode;
use crate::error::{CodecError, ProtocolError};
use crate::frame::{Frame, OpCode, DEFAULT_MAX_PAYLOAD_SIZE, MAX_CONTROL_PAYLOAD};
use crate::mask::apply_mask;
use crate::role::Role;

/// Codec for encoding/decoding WebSocket frames.
///
/// Decoding enforces the framing rules for the local `role` and yields
/// frames with unmasked payloads. Fragmented messages are not reassembled;
/// the codec only tracks whether one is open so it can reject
/// out-of-sequence continuation frames.
#[derive(Debug, Clone)]
pub struct WebSocketCodec {
    /// Local endpoint role
    role: Role,
    /// Upper bound for a single frame payload
    max_payload_size: usize,
    /// A non-final data frame has been seen and its message is still open
    in_fragmented_message: bool,
}

impl WebSocketCodec {
    /// Create a new codec with the default payload limit
    pub fn new(role: Role) -> Self {
        Self::with_max_payload_size(role, DEFAULT_MAX_PAYLOAD_SIZE)
    }

    /// Create a new codec with a custom payload limit
    pub fn with_max_payload_size(role: Role, max_payload_size: usize) -> Self {
        Self {
            role,
            max_payload_size,
            in_fragmented_message: false,
        }
    }

    /// Local endpoint role
    pub fn role(&self) -> Role {
        self.role
    }
}

impl Default for WebSocketCodec {
    fn default() -> Self {
        Self::new(Role::default())
    }
}

/// Parse the payload length field.
///
/// Returns the length and the offset of the byte following it, or `None` if
/// the extended length has not arrived yet.
fn decode_payload_length(src: &BytesMut) -> Result<Option<(u64, usize)>, ProtocolError> {
    match src[1] & 0x7F {
        126 => {
            if src.len() < 4 {
                return Ok(None);
            }
            let len = u16::from_be_bytes([src[2], src[3]]) as u64;
            if len < 126 {
                return Err(ProtocolError::InvalidPayloadLength);
            }
            Ok(Some((len, 4)))
        }
        127 => {
            if src.len() < 10 {
                return Ok(None);
            }
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&src[2..10]);
            let len = u64::from_be_bytes(raw);
            // MSB must be zero and the value must not fit the 16-bit form
            if len & (1 << 63) != 0 || len <= u16::MAX as u64 {
                return Err(ProtocolError::InvalidPayloadLength);
            }
            Ok(Some((len, 10)))
        }
        len => Ok(Some((len as u64, 2))),
    }
}

fn validate_close_payload(payload: &[u8]) -> Result<(), ProtocolError> {
    match payload.len() {
        0 => Ok(()),
        1 => Err(ProtocolError::InvalidClosePayload(1)),
        _ => {
            let code = u16::from_be_bytes([payload[0], payload[1]]);
            if !CloseCode::is_sendable(code) {
                return Err(ProtocolError::InvalidCloseCode(code));
            }
            std::str::from_utf8(&payload[2..]).map_err(|_| ProtocolError::InvalidUtf8)?;
            Ok(())
        }
    }
}

impl Decoder for WebSocketCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 2 {
            return Ok(None);
        }

        let first = src[0];
        let fin = first & 0x80 != 0;

        let rsv = (first >> 4) & 0x7;
        if rsv != 0 {
            return Err(ProtocolError::ReservedBitsSet(rsv).into());
        }

        let opcode_byte = first & 0x0F;
        let opcode =
            OpCode::from_u8(opcode_byte).ok_or(ProtocolError::InvalidOpcode(opcode_byte))?;

        let masked = src[1] & 0x80 != 0;
        if masked != self.role.expects_masked_input() {
            let err = if masked {
                ProtocolError::MaskedFrame
            } else {
                ProtocolError::UnmaskedFrame
            };
            return Err(err.into());
        }

        let (payload_len, header_len) = match decode_payload_length(src)? {
            Some(parsed) => parsed,
            None => return Ok(None),
        };

        if opcode.is_control() {
            if !fin {
                return Err(ProtocolError::FragmentedControlFrame.into());
            }
            if payload_len > MAX_CONTROL_PAYLOAD as u64 {
                return Err(ProtocolError::ControlFrameTooLarge {
                    size: payload_len,
                    max: MAX_CONTROL_PAYLOAD,
                }
                .into());
            }
        }

        if payload_len > self.max_payload_size as u64 {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_len,
                max: self.max_payload_size,
            }
            .into());
        }

        match opcode {
            OpCode::Continuation if !self.in_fragmented_message => {
                return Err(ProtocolError::UnexpectedContinuation.into());
            }
            op if op.is_data() && self.in_fragmented_message => {
                return Err(ProtocolError::ExpectedContinuation(opcode_byte).into());
            }
            _ => {}
        }

        // Bounded by max_payload_size above
        let payload_len = payload_len as usize;
        let mask_len = if masked { 4 } else { 0 };
        let frame_len = header_len + mask_len + payload_len;
        if src.len() < frame_len {
            // Wait for the rest of the frame without consuming anything
            src.reserve(frame_len - src.len());
            return Ok(None);
        }

        src.advance(header_len);
        let mask = if masked {
            let key = [src[0], src[1], src[2], src[3]];
            src.advance(4);
            Some(key)
        } else {
            None
        };

        let mut payload = src.split_to(payload_len);
        if let Some(key) = mask {
            apply_mask(&mut payload, key);
        }

        match opcode {
            OpCode::Text if fin => {
                std::str::from_utf8(&payload).map_err(|_| ProtocolError::InvalidUtf8)?;
            }
            OpCode::Close => validate_close_payload(&payload)?,
            _ => {}
        }

        if !opcode.is_control() {
            self.in_fragmented_message = !fin;
        }

        tracing::trace!(
            "Decoded {:?} frame, fin={}, {} byte payload",
            opcode,
            fin,
            payload_len
        );

        Ok(Some(Frame::new(fin, opcode, mask, payload.freeze())))
    }
}

impl Encoder<Frame> for WebSocketCodec {
    type Error = CodecError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload_len = frame.payload.len();

        if frame.opcode.is_control() && payload_len > MAX_CONTROL_PAYLOAD {
            return Err(ProtocolError::ControlFrameTooLarge {
                size: payload_len as u64,
                max: MAX_CONTROL_PAYLOAD,
            }
            .into());
        }

        dst.reserve(14 + payload_len);

        let mut first = frame.opcode.as_u8();
        if frame.fin {
            first |= 0x80;
        }
        dst.put_u8(first);

        let mask_bit = if frame.is_masked() { 0x80 } else { 0x00 };
        if payload_len < 126 {
            dst.put_u8(mask_bit | payload_len as u8);
        } else if payload_len <= u16::MAX as usize {
            dst.put_u8(mask_bit | 126);
            dst.put_u16(payload_len as u16);
        } else {
            dst.put_u8(mask_bit | 127);
            dst.put_u64(payload_len as u64);
        }

        match frame.mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.extend_from_slice(&frame.payload);
                apply_mask(&mut dst[start..], key);
            }
            None => dst.extend_from_slice(&frame.payload),
        }

        Ok(())
    }
}
