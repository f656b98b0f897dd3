//! Pipeline context trait

use futures::future::BoxFuture;
use wsg_protocol::Frame;

use crate::error::PipelineError;

/// Resolves once a submitted frame has been written and flushed, or the
/// write has failed
pub type WriteCompletion = BoxFuture<'static, Result<(), PipelineError>>;

/// The view a pipeline stage has of its connection.
///
/// None of these calls block. Implementations must tolerate `close` being
/// called more than once and writes submitted after the connection closed.
pub trait PipelineContext: Send + Sync + 'static {
    /// Submit a frame for write and flush
    fn write_and_flush(&self, frame: Frame) -> WriteCompletion;

    /// Close the underlying connection, fire-and-forget
    fn close(&self);

    /// Pass an error on to the next observer on the inbound path
    fn fire_error(&self, error: PipelineError);
}
