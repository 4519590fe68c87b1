//! Video input: decoding frames and choosing which ones to read.

pub mod sampler;
pub mod source;

pub use sampler::{FrameSampler, SampledFrame};
pub use source::{FfmpegSource, FrameSource};
