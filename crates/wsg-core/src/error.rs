//! Core error types for ws-guard

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use wsg_protocol::{CodecError, ProtocolError};

/// Errors travelling along a connection's inbound error path
#[derive(Error, Debug)]
pub enum PipelineError {
    /// WebSocket framing violation raised by the decoder
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Operation attempted on a closed connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// The transport did not accept a frame in time
    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),
}

impl PipelineError {
    /// The framing violation carried by this error, if it is one
    pub fn as_protocol_error(&self) -> Option<&ProtocolError> {
        match self {
            PipelineError::Protocol(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CodecError> for PipelineError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Protocol(err) => PipelineError::Protocol(err),
            CodecError::Io(err) => PipelineError::Io(err),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
