//! wsg-core: Connection pipeline and protocol error responder for ws-guard
//!
//! The [`ProtocolErrorResponder`] sits on the inbound error path of a
//! connection. When frame decoding fails with a WebSocket protocol
//! violation it writes a Close frame with the matching status code, closes
//! the connection once the write settles, and always forwards the original
//! error to the next observer. [`Connection`] drives a transport with the
//! responder installed.

pub mod config;
pub mod connection;
pub mod error;
pub mod responder;
pub mod traits;

pub use config::ConnectionConfig;
pub use connection::{Connection, ConnectionEvent};
pub use error::{ConfigError, PipelineError};
pub use responder::ProtocolErrorResponder;
pub use traits::{PipelineContext, WriteCompletion};
