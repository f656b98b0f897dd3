//! wsg-protocol: WebSocket wire protocol for ws-guard
//!
//! This crate defines the RFC 6455 frame model, the close status codes and
//! the mapping from framing violations to those codes. The codec in
//! `codec.rs` is the decoder that raises [`ProtocolError`]s and the encoder
//! that serializes outbound frames.

pub mod close_code;
pub mod codec;
pub mod error;
pub mod frame;
pub mod mask;
pub mod role;

pub use close_code::CloseCode;
pub use codec::WebSocketCodec;
pub use error::{CodecError, ProtocolError};
pub use frame::{Frame, OpCode, DEFAULT_MAX_PAYLOAD_SIZE, MAX_CONTROL_PAYLOAD};
pub use mask::{apply_mask, random_mask_key};
pub use role::Role;
