//! Close status codes (RFC 6455, section 7.4)

use std::fmt;

/// Status code carried in the first two bytes of a Close frame payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CloseCode {
    /// Normal closure
    Normal = 1000,
    /// Endpoint is going away (server shutdown, page navigation)
    GoingAway = 1001,
    /// Endpoint is terminating the connection due to a protocol error
    ProtocolError = 1002,
    /// Received a type of data the endpoint cannot accept
    Unsupported = 1003,
    /// Message data was not consistent with the message type (e.g. bad UTF-8)
    InvalidPayload = 1007,
    /// Generic policy violation
    PolicyViolation = 1008,
    /// Message too big to process
    MessageTooBig = 1009,
    /// Client expected the server to negotiate an extension
    MandatoryExtension = 1010,
    /// Server hit an unexpected condition
    InternalError = 1011,
}

impl CloseCode {
    /// Convert to u16
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Convert from u16
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1000 => Some(Self::Normal),
            1001 => Some(Self::GoingAway),
            1002 => Some(Self::ProtocolError),
            1003 => Some(Self::Unsupported),
            1007 => Some(Self::InvalidPayload),
            1008 => Some(Self::PolicyViolation),
            1009 => Some(Self::MessageTooBig),
            1010 => Some(Self::MandatoryExtension),
            1011 => Some(Self::InternalError),
            _ => None,
        }
    }

    /// Big-endian wire representation, as placed in a Close payload
    pub fn to_be_bytes(&self) -> [u8; 2] {
        self.as_u16().to_be_bytes()
    }

    /// Whether a status code received from a peer is allowed on the wire.
    ///
    /// 1004, 1005, 1006 and 1015 are reserved for local use and must never
    /// appear in a Close frame. 3000-3999 are registered with IANA and
    /// 4000-4999 are private use.
    pub fn is_sendable(code: u16) -> bool {
        matches!(code, 1000..=1003 | 1007..=1011 | 3000..=4999)
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.as_u16(), self)
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.as_u16()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_code_roundtrip() {
        for code in [
            CloseCode::Normal,
            CloseCode::GoingAway,
            CloseCode::ProtocolError,
            CloseCode::Unsupported,
            CloseCode::InvalidPayload,
            CloseCode::PolicyViolation,
            CloseCode::MessageTooBig,
            CloseCode::MandatoryExtension,
            CloseCode::InternalError,
        ] {
            assert_eq!(CloseCode::from_u16(code.as_u16()), Some(code));
        }
    }

    #[test]
    fn test_protocol_error_bytes() {
        assert_eq!(CloseCode::ProtocolError.to_be_bytes(), [0x03, 0xEA]);
    }

    #[test]
    fn test_reserved_codes_not_sendable() {
        for code in [0, 999, 1004, 1005, 1006, 1012, 1015, 2999, 5000] {
            assert!(!CloseCode::is_sendable(code), "{} should be rejected", code);
        }
        for code in [1000, 1002, 1011, 3000, 4999] {
            assert!(CloseCode::is_sendable(code), "{} should be accepted", code);
        }
    }
}
