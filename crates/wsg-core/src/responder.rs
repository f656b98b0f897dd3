//! Protocol error responder
//!
//! Installed on a connection's inbound error path. A WebSocket protocol
//! violation means nothing more the peer sends can be trusted, so the
//! responder tells the peer why with a Close frame and then drops the
//! connection without waiting for the peer's own Close. Every error,
//! protocol or not, is forwarded unchanged to the next observer.

use std::sync::Arc;

use wsg_protocol::{CloseCode, Frame, Role};

use crate::error::PipelineError;
use crate::traits::PipelineContext;

/// Turns decoder protocol errors into a Close frame followed by a close
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolErrorResponder {
    /// Fixed for the lifetime of the connection; decides masking
    role: Role,
}

impl ProtocolErrorResponder {
    /// Create a responder for one connection
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    /// Role this responder builds frames for
    pub fn role(&self) -> Role {
        self.role
    }

    /// Close frame carrying `code`, masked with a fresh key for clients
    pub fn close_frame(&self, code: CloseCode) -> Frame {
        Frame::close(code, self.role.outbound_mask())
    }

    /// Handle an error observed on the inbound path.
    ///
    /// For a protocol error with a status code, the Close frame is submitted
    /// and a task is spawned that closes the connection once the write
    /// settles, whatever its outcome. The error is then forwarded before this
    /// returns, without waiting for the write. Must be called from within a
    /// tokio runtime.
    pub fn on_error<C>(&self, ctx: &Arc<C>, error: PipelineError)
    where
        C: PipelineContext + ?Sized,
    {
        if let Some(protocol_error) = error.as_protocol_error() {
            match protocol_error.close_code() {
                Some(code) => {
                    tracing::debug!(
                        "Protocol error ({}), sending close {} as {}",
                        protocol_error,
                        code,
                        self.role
                    );
                    self.close_with(ctx, code);
                }
                None => {
                    tracing::warn!(
                        "Protocol error without a close code, leaving connection open: {}",
                        protocol_error
                    );
                }
            }
        }

        ctx.fire_error(error);
    }

    fn close_with<C>(&self, ctx: &Arc<C>, code: CloseCode)
    where
        C: PipelineContext + ?Sized,
    {
        let completion = ctx.write_and_flush(self.close_frame(code));
        let ctx = Arc::clone(ctx);

        tokio::spawn(async move {
            if let Err(e) = completion.await {
                tracing::debug!("Close frame write failed: {}", e);
            }
            ctx.close();
        });
    }
}
