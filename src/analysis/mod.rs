//! Payload analytics derived from successful fetches.

pub mod amplify;
pub mod pipeline;

pub use amplify::{amplify, Amplification};
pub use pipeline::{char_frequencies, longest_line, AnalyticsPipeline};
