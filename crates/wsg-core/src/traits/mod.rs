//! Core trait definitions

mod pipeline;

pub use pipeline::{PipelineContext, WriteCompletion};
