//! Protocol error types

use thiserror::Error;

use crate::close_code::CloseCode;

/// Framing violations detected while decoding WebSocket frames
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Opcode is reserved or unknown
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// RSV1-3 set without a negotiated extension
    #[error("Reserved bits set: {0:#05b}")]
    ReservedBitsSet(u8),

    /// Control frame without the FIN bit
    #[error("Fragmented control frame")]
    FragmentedControlFrame,

    /// Control frame payload above the 125 byte limit
    #[error("Control frame too large: {size} bytes exceeds maximum of {max} bytes")]
    ControlFrameTooLarge { size: u64, max: usize },

    /// Extended length that is not minimally encoded or has the MSB set
    #[error("Invalid payload length encoding")]
    InvalidPayloadLength,

    /// Frame from a client without a masking key
    #[error("Unmasked frame received from client")]
    UnmaskedFrame,

    /// Frame from a server with a masking key
    #[error("Masked frame received from server")]
    MaskedFrame,

    /// Continuation frame with no fragmented message in progress
    #[error("Unexpected continuation frame")]
    UnexpectedContinuation,

    /// New data frame while a fragmented message is still open
    #[error("Expected continuation frame, got {0:#x}")]
    ExpectedContinuation(u8),

    /// Close payload of exactly one byte
    #[error("Invalid close frame payload length: {0}")]
    InvalidClosePayload(usize),

    /// Close status code that must not appear on the wire
    #[error("Invalid close code: {0}")]
    InvalidCloseCode(u16),

    /// Text or close reason that is not valid UTF-8
    #[error("Invalid UTF-8 in text payload")]
    InvalidUtf8,

    /// Payload above the configured maximum
    #[error("Payload too large: {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: u64, max: usize },

    /// Framing violation the decoder could not attribute to a known condition
    #[error("Unclassified protocol violation: {0}")]
    Unclassified(String),
}

impl ProtocolError {
    /// Close status code to report to the peer for this violation.
    ///
    /// Returns `None` only for [`ProtocolError::Unclassified`].
    pub fn close_code(&self) -> Option<CloseCode> {
        match self {
            ProtocolError::InvalidOpcode(_)
            | ProtocolError::ReservedBitsSet(_)
            | ProtocolError::FragmentedControlFrame
            | ProtocolError::ControlFrameTooLarge { .. }
            | ProtocolError::InvalidPayloadLength
            | ProtocolError::UnmaskedFrame
            | ProtocolError::MaskedFrame
            | ProtocolError::UnexpectedContinuation
            | ProtocolError::ExpectedContinuation(_)
            | ProtocolError::InvalidClosePayload(_)
            | ProtocolError::InvalidCloseCode(_) => Some(CloseCode::ProtocolError),
            ProtocolError::InvalidUtf8 => Some(CloseCode::InvalidPayload),
            ProtocolError::PayloadTooLarge { .. } => Some(CloseCode::MessageTooBig),
            ProtocolError::Unclassified(_) => None,
        }
    }
}

/// Errors produced by [`crate::WebSocketCodec`]
#[derive(Error, Debug)]
pub enum CodecError {
    /// Peer violated the framing rules
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
